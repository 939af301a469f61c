use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use super::data::{Product, SortKey, SortOrder};
use crate::error::{CatalogError, CatalogResult};

/// Durable storage behind the catalog.
///
/// Each call commits on its own: when it returns `Ok` the write is durable,
/// when it returns `Err` nothing was written.
pub trait ProductStore {
    fn insert(&mut self, product: &Product) -> CatalogResult<()>;

    fn fetch_all(&self, order: SortOrder) -> CatalogResult<Vec<Product>>;

    fn fetch(&self, id: Uuid) -> CatalogResult<Option<Product>>;

    fn count(&self) -> CatalogResult<usize>;

    /// Returns false when no product has that id
    fn set_has_image(&mut self, id: Uuid, has_image: bool) -> CatalogResult<bool>;
}

const SELECT_COLUMNS: &str =
    "SELECT id, name, description, price, provider, has_image, created_at FROM products";

/// SQLite-backed product table
pub struct SqliteStore {
    conn: Connection,
    db_path: Option<PathBuf>,
}

impl SqliteStore {
    /// Open or create the database file and make sure the schema exists
    pub fn open(path: &Path) -> CatalogResult<Self> {
        let conn = Connection::open(path)?;
        tracing::info!(path = %path.display(), "📁 catalog database opened");

        let store = SqliteStore {
            conn,
            db_path: Some(path.to_path_buf()),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// A private database that disappears with the store
    pub fn open_in_memory() -> CatalogResult<Self> {
        let store = SqliteStore {
            conn: Connection::open_in_memory()?,
            db_path: None,
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Path of the database file, `None` for in-memory stores
    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Create the products table and its indexes if they don't exist
    fn init_schema(&self) -> CatalogResult<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS products (
                id              TEXT PRIMARY KEY NOT NULL,
                name            TEXT,
                description     TEXT,
                price           REAL NOT NULL,
                provider        TEXT,
                has_image       INTEGER NOT NULL DEFAULT 0,
                created_at      INTEGER NOT NULL
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_products_name ON products(name)",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_products_created_at ON products(created_at)",
            [],
        )?;

        tracing::debug!("catalog schema initialized");
        Ok(())
    }
}

/// Column values as SQLite hands them back, before the id is parsed
struct StoredRow {
    id: String,
    name: Option<String>,
    description: Option<String>,
    price: f64,
    provider: Option<String>,
    has_image: bool,
    created_at_ms: i64,
}

impl StoredRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(StoredRow {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            price: row.get(3)?,
            provider: row.get(4)?,
            has_image: row.get(5)?,
            created_at_ms: row.get(6)?,
        })
    }

    fn into_product(self) -> CatalogResult<Product> {
        let id = Uuid::parse_str(&self.id).map_err(|_| CatalogError::CorruptRecord(self.id))?;
        let created_at = DateTime::<Utc>::from_timestamp_millis(self.created_at_ms).ok_or(
            CatalogError::CorruptTimestamp {
                id,
                millis: self.created_at_ms,
            },
        )?;
        Ok(Product {
            id,
            name: self.name,
            description: self.description,
            price: self.price,
            provider: self.provider,
            has_image: self.has_image,
            created_at,
        })
    }
}

fn order_clause(order: SortOrder) -> &'static str {
    match (order.key, order.ascending) {
        (SortKey::Name, true) => "ORDER BY name ASC, id ASC",
        (SortKey::Name, false) => "ORDER BY name DESC, id DESC",
        (SortKey::Id, true) => "ORDER BY id ASC",
        (SortKey::Id, false) => "ORDER BY id DESC",
        (SortKey::CreatedAt, true) => "ORDER BY created_at ASC, id ASC",
        (SortKey::CreatedAt, false) => "ORDER BY created_at DESC, id DESC",
    }
}

impl ProductStore for SqliteStore {
    fn insert(&mut self, product: &Product) -> CatalogResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO products (id, name, description, price, provider, has_image, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                product.id.to_string(),
                product.name,
                product.description,
                product.price,
                product.provider,
                product.has_image,
                product.created_at.timestamp_millis(),
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn fetch_all(&self, order: SortOrder) -> CatalogResult<Vec<Product>> {
        let sql = format!("{SELECT_COLUMNS} {}", order_clause(order));
        let mut stmt = self.conn.prepare(&sql)?;

        let rows = stmt.query_map([], StoredRow::read)?;

        let mut products = Vec::new();
        for row in rows {
            products.push(row?.into_product()?);
        }

        Ok(products)
    }

    fn fetch(&self, id: Uuid) -> CatalogResult<Option<Product>> {
        let sql = format!("{SELECT_COLUMNS} WHERE id = ?1");
        let row = self
            .conn
            .query_row(&sql, [id.to_string()], StoredRow::read)
            .optional()?;

        row.map(StoredRow::into_product).transpose()
    }

    fn count(&self) -> CatalogResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn set_has_image(&mut self, id: Uuid, has_image: bool) -> CatalogResult<bool> {
        let changed = self.conn.execute(
            "UPDATE products SET has_image = ?1 WHERE id = ?2",
            params![has_image, id.to_string()],
        )?;
        Ok(changed > 0)
    }
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("db_path", &self.db_path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(name: &str, created_at_ms: i64) -> Product {
        Product {
            id: Uuid::new_v4(),
            name: Some(name.to_string()),
            description: None,
            price: 9.5,
            provider: Some("Acme".to_string()),
            has_image: false,
            created_at: DateTime::<Utc>::from_timestamp_millis(created_at_ms).unwrap(),
        }
    }

    #[test]
    fn test_insert_and_fetch() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let desk = product("Desk", 1_000);

        store.insert(&desk).unwrap();

        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(store.fetch(desk.id).unwrap(), Some(desk));
        assert_eq!(store.fetch(Uuid::new_v4()).unwrap(), None);
    }

    #[test]
    fn test_duplicate_id_rejected_without_partial_write() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let desk = product("Desk", 1_000);
        store.insert(&desk).unwrap();

        let mut clash = product("Lamp", 2_000);
        clash.id = desk.id;
        let err = store.insert(&clash).unwrap_err();

        assert!(matches!(err, CatalogError::Persistence(_)));
        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(store.fetch(desk.id).unwrap().unwrap().name.as_deref(), Some("Desk"));
    }

    #[test]
    fn test_ordering() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        for (name, at) in [("Banana", 3), ("apple", 1), ("Cherry", 2)] {
            store.insert(&product(name, at)).unwrap();
        }

        let names = |order: SortOrder| -> Vec<String> {
            store
                .fetch_all(order)
                .unwrap()
                .into_iter()
                .filter_map(|p| p.name)
                .collect()
        };

        // Binary collation: uppercase sorts before lowercase
        assert_eq!(
            names(SortOrder::ascending(SortKey::Name)),
            ["Banana", "Cherry", "apple"]
        );
        assert_eq!(
            names(SortOrder::descending(SortKey::Name)),
            ["apple", "Cherry", "Banana"]
        );
        assert_eq!(
            names(SortOrder::ascending(SortKey::CreatedAt)),
            ["apple", "Cherry", "Banana"]
        );

        let ids: Vec<Uuid> = store
            .fetch_all(SortOrder::ascending(SortKey::Id))
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn test_set_has_image() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let desk = product("Desk", 1);
        store.insert(&desk).unwrap();

        assert!(store.set_has_image(desk.id, true).unwrap());
        assert!(store.fetch(desk.id).unwrap().unwrap().has_image);
        assert!(!store.set_has_image(Uuid::new_v4(), true).unwrap());
    }

    #[test]
    fn test_corrupt_id_reported() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .conn
            .execute(
                "INSERT INTO products (id, price, created_at) VALUES ('not-a-uuid', 1.0, 0)",
                [],
            )
            .unwrap();

        let err = store.fetch_all(SortOrder::default()).unwrap_err();
        assert!(matches!(err, CatalogError::CorruptRecord(id) if id == "not-a-uuid"));
    }

    #[test]
    fn test_out_of_range_timestamp_reported() {
        let store = SqliteStore::open_in_memory().unwrap();
        let id = Uuid::new_v4();
        store
            .conn
            .execute(
                "INSERT INTO products (id, price, created_at) VALUES (?1, 1.0, ?2)",
                params![id.to_string(), i64::MAX],
            )
            .unwrap();

        let err = store.fetch(id).unwrap_err();
        assert!(matches!(
            err,
            CatalogError::CorruptTimestamp { id: bad, millis } if bad == id && millis == i64::MAX
        ));
        assert!(store.fetch_all(SortOrder::default()).is_err());
    }

    #[test]
    fn test_file_backed_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.db");
        let desk = product("Desk", 5);

        {
            let mut store = SqliteStore::open(&path).unwrap();
            store.insert(&desk).unwrap();
            assert_eq!(store.path(), Some(path.as_path()));
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.fetch(desk.id).unwrap(), Some(desk));
    }
}
