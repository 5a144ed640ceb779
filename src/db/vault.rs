//! 保险库存储子模块
//!
//! 只负责不透明密文的存取；加解密与锁定状态属于上层，不在本 crate 内。

use rusqlite::params;

use crate::error::AppError;

use super::{format_timestamp, now_local, ClipboardStore, VaultEntry};

impl ClipboardStore {
    pub fn add_vault_item(&self, encrypted_content: &[u8], label: &str) -> Result<i64, AppError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO secure_vault (encrypted_content, label, created_at) VALUES (?1, ?2, ?3)",
                params![encrypted_content, label, format_timestamp(now_local())],
            ).map_err(|e| AppError::Database(format!("写入保险库失败: {}", e)))?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// 最新的在前
    pub fn get_vault_items(&self) -> Result<Vec<VaultEntry>, AppError> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT id, encrypted_content, label, created_at FROM secure_vault ORDER BY id DESC")
                .map_err(|e| AppError::Database(format!("准备保险库查询失败: {}", e)))?;
            stmt.query_map([], |row| {
                Ok(VaultEntry {
                    id: row.get(0)?,
                    encrypted_content: row.get::<_, Option<Vec<u8>>>(1)?.unwrap_or_default(),
                    label: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    created_at: row.get(3).unwrap_or(None),
                })
            })
            .map_err(|e| AppError::Database(format!("查询保险库失败: {}", e)))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| AppError::Database(format!("读取保险库失败: {}", e)))
        })
    }

    pub fn delete_vault_item(&self, id: i64) -> Result<bool, AppError> {
        self.with_conn(|conn| {
            let changed = conn
                .execute("DELETE FROM secure_vault WHERE id = ?1", params![id])
                .map_err(|e| AppError::Database(format!("删除保险库条目失败: {}", e)))?;
            Ok(changed > 0)
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::db::test_support::memory_store;

    #[test]
    fn vault_stores_opaque_blobs() {
        let store = memory_store();
        let first = store.add_vault_item(&[0xde, 0xad], "wifi").expect("add");
        let second = store.add_vault_item(&[0xbe, 0xef], "bank").expect("add");

        let entries = store.get_vault_items().expect("list");
        assert_eq!(entries.iter().map(|e| e.id).collect::<Vec<_>>(), vec![second, first]);
        assert_eq!(entries[1].encrypted_content, vec![0xde, 0xad]);
        assert_eq!(entries[1].label, "wifi");
        assert!(entries[0].created_at.is_some());

        assert!(store.delete_vault_item(first).expect("delete"));
        assert_eq!(store.get_vault_items().expect("list").len(), 1);
    }
}
