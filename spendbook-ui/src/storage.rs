//! Browser Local Storage
//!
//! `window.localStorage` behind the core's [`KeyValueStore`] trait. The
//! storage handle is looked up on every call, so the type holds no JS values.

use spendbook::storage::{KeyValueStore, StorageError, StorageResult};

/// `localStorage` of the current window
#[derive(Clone, Copy, Debug, Default)]
pub struct WebStorage;

impl WebStorage {
    fn storage(&self) -> StorageResult<web_sys::Storage> {
        web_sys::window()
            .ok_or_else(|| StorageError::Unavailable("no window".to_string()))?
            .local_storage()
            .map_err(|e| StorageError::Unavailable(format!("{:?}", e)))?
            .ok_or_else(|| StorageError::Unavailable("localStorage disabled".to_string()))
    }
}

impl KeyValueStore for WebStorage {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        self.storage()?
            .get_item(key)
            .map_err(|e| StorageError::Unavailable(format!("{:?}", e)))
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        self.storage()?
            .set_item(key, value)
            .map_err(|e| StorageError::Unavailable(format!("{:?}", e)))
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        self.storage()?
            .remove_item(key)
            .map_err(|e| StorageError::Unavailable(format!("{:?}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn test_local_storage_round_trip() {
        let storage = WebStorage;
        storage.set_item("spendbook-test", "{\"id\":\"u1\"}").unwrap();
        assert_eq!(
            storage.get_item("spendbook-test").unwrap().as_deref(),
            Some("{\"id\":\"u1\"}")
        );

        storage.remove_item("spendbook-test").unwrap();
        assert_eq!(storage.get_item("spendbook-test").unwrap(), None);
    }
}
