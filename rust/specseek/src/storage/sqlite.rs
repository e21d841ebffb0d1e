use crate::errors::{
    NotFound,
    Result,
};
use crate::storage::SpectrumStore;
use rusqlite::{
    Connection,
    OptionalExtension,
    params,
};
use specquery::models::{
    NormalizedSpectrum,
    SimilarityIndex,
    SpectrumCategory,
    SpectrumId,
};
use std::path::Path;
use std::sync::Mutex;

/// Compression level for persisted index blobs.
const INDEX_ZSTD_LEVEL: i32 = 3;

/// SQLite-backed durable store.
///
/// Spectra and per-category indexes are MessagePack blobs; the index
/// blob is additionally zstd-compressed since it is rewritten whole on
/// every mutation. The connection is wrapped in a mutex so the store
/// can be shared across scoring threads.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS spectra (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                category TEXT NOT NULL,
                name TEXT NOT NULL,
                record BLOB NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_spectra_category ON spectra(category);
            CREATE TABLE IF NOT EXISTS category_indices (
                category TEXT PRIMARY KEY,
                blob BLOB NOT NULL
            );",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

fn encode_index(index: &SimilarityIndex) -> Result<Vec<u8>> {
    let packed = rmp_serde::to_vec(index)?;
    Ok(zstd::encode_all(&packed[..], INDEX_ZSTD_LEVEL)?)
}

fn decode_index(blob: &[u8]) -> Result<SimilarityIndex> {
    let packed = zstd::decode_all(blob)?;
    Ok(rmp_serde::from_slice(&packed)?)
}

impl SpectrumStore for SqliteStore {
    fn get_spectrum(&self, id: SpectrumId) -> Result<NormalizedSpectrum> {
        let conn = self.conn.lock().unwrap();
        let blob: Option<Vec<u8>> = conn
            .query_row(
                "SELECT record FROM spectra WHERE id = ?1",
                params![id.0 as i64],
                |row| row.get(0),
            )
            .optional()?;
        match blob {
            Some(blob) => Ok(rmp_serde::from_slice(&blob)?),
            None => Err(NotFound::Spectrum { id }.into()),
        }
    }

    fn put_spectrum(&self, record: &NormalizedSpectrum) -> Result<SpectrumId> {
        let blob = rmp_serde::to_vec(record)?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO spectra (category, name, record) VALUES (?1, ?2, ?3)",
            params![record.category.as_str(), record.name, blob],
        )?;
        Ok(SpectrumId(conn.last_insert_rowid() as u64))
    }

    fn delete_spectrum(&self, id: SpectrumId) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute("DELETE FROM spectra WHERE id = ?1", params![id.0 as i64])?;
        if changed == 0 {
            return Err(NotFound::Spectrum { id }.into());
        }
        Ok(())
    }

    fn list_spectra(
        &self,
        category: SpectrumCategory,
    ) -> Result<Vec<(SpectrumId, NormalizedSpectrum)>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT id, record FROM spectra WHERE category = ?1 ORDER BY id")?;
        let rows = stmt.query_map(params![category.as_str()], |row| {
            let id: i64 = row.get(0)?;
            let blob: Vec<u8> = row.get(1)?;
            Ok((id, blob))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (id, blob) = row?;
            out.push((SpectrumId(id as u64), rmp_serde::from_slice(&blob)?));
        }
        Ok(out)
    }

    fn get_index(&self, category: SpectrumCategory) -> Result<Option<SimilarityIndex>> {
        let conn = self.conn.lock().unwrap();
        let blob: Option<Vec<u8>> = conn
            .query_row(
                "SELECT blob FROM category_indices WHERE category = ?1",
                params![category.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        match blob {
            Some(blob) => Ok(Some(decode_index(&blob)?)),
            None => Ok(None),
        }
    }

    fn put_index(&self, category: SpectrumCategory, index: &SimilarityIndex) -> Result<()> {
        let blob = encode_index(index)?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO category_indices (category, blob) VALUES (?1, ?2)
             ON CONFLICT(category) DO UPDATE SET blob = excluded.blob",
            params![category.as_str(), blob],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use specquery::models::VECTOR_LEN;

    fn sample(name: &str) -> NormalizedSpectrum {
        NormalizedSpectrum {
            category: SpectrumCategory::Infrared,
            intensities: vec![7u16; VECTOR_LEN],
            dominant_peak: 1200.0,
            peaks: vec![1200.0, 2400.0],
            name: name.to_string(),
            substance_class: "test".to_string(),
        }
    }

    #[test]
    fn test_spectrum_round_trip() {
        let store = SqliteStore::open_in_memory().unwrap();
        let id = store.put_spectrum(&sample("water")).unwrap();
        let loaded = store.get_spectrum(id).unwrap();
        assert_eq!(loaded, sample("water"));
    }

    #[test]
    fn test_ids_are_not_reused() {
        let store = SqliteStore::open_in_memory().unwrap();
        let a = store.put_spectrum(&sample("a")).unwrap();
        store.delete_spectrum(a).unwrap();
        let b = store.put_spectrum(&sample("b")).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_missing_spectrum_is_not_found() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(matches!(
            store.get_spectrum(SpectrumId(99)),
            Err(crate::errors::SpecseekError::NotFound(_))
        ));
        assert!(store.delete_spectrum(SpectrumId(99)).is_err());
    }

    #[test]
    fn test_index_round_trip() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(store.get_index(SpectrumCategory::Raman).unwrap().is_none());

        let mut index = SimilarityIndex::new();
        index.insert(SpectrumId(1), &[5], &[333.0, 1999.0]);
        store.put_index(SpectrumCategory::Raman, &index).unwrap();
        let loaded = store.get_index(SpectrumCategory::Raman).unwrap().unwrap();
        assert_eq!(loaded, index);

        // Overwrite on conflict.
        index.insert(SpectrumId(2), &[6], &[500.0]);
        store.put_index(SpectrumCategory::Raman, &index).unwrap();
        let loaded = store.get_index(SpectrumCategory::Raman).unwrap().unwrap();
        assert_eq!(loaded, index);
    }
}
