// Dashboard session: configuration plus the dataset and report caches.
//
// Datasets are keyed by the source's canonical path and modification time,
// so a file replaced on disk is reloaded on the next request even inside the
// TTL window. Reports are keyed by source, filter and report kind. Once a
// newer version of a file is loaded, entries for older versions are dropped.

use crate::cache::TtlCache;
use crate::config::Config;
use crate::error::{DashboardError, Result};
use crate::export::Sheet;
use crate::filter::{self, FilterSpec};
use crate::loader::{self, QualityReport};
use crate::report::{build_report, ReportKind, ReportParams};
use crate::schema::Table;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceId {
    pub path: PathBuf,
    pub modified: Option<SystemTime>,
}

impl SourceId {
    pub fn of(path: &Path) -> Result<SourceId> {
        let not_found = || DashboardError::SourceNotFound {
            path: path.to_path_buf(),
        };
        let canonical = path.canonicalize().map_err(|_| not_found())?;
        let meta = std::fs::metadata(&canonical).map_err(|_| not_found())?;
        if !meta.is_file() {
            return Err(not_found());
        }
        Ok(SourceId {
            path: canonical,
            modified: meta.modified().ok(),
        })
    }
}

#[derive(Debug)]
pub struct Dataset {
    pub table: Table,
    pub quality: QualityReport,
}

type ReportKey = (SourceId, FilterSpec, ReportKind);

pub struct Session {
    config: Config,
    params: ReportParams,
    datasets: TtlCache<SourceId, Dataset>,
    reports: TtlCache<ReportKey, Vec<Sheet>>,
}

impl Session {
    pub fn new(config: Config) -> Session {
        Session {
            params: ReportParams::from_config(&config),
            datasets: TtlCache::new(config.cache_ttl),
            reports: TtlCache::new(config.cache_ttl),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Loaded and cleaned data for `path`, read from disk at most once per
    /// TTL window for an unchanged file.
    pub fn dataset(&self, path: &Path) -> Result<Arc<Dataset>> {
        self.dataset_for(&SourceId::of(path)?)
    }

    fn dataset_for(&self, id: &SourceId) -> Result<Arc<Dataset>> {
        let data = self.datasets.get_or_try_insert_with(id, || {
            let (table, quality) = loader::load(&id.path)?;
            Ok::<_, crate::error::DashboardError>(Dataset { table, quality })
        })?;
        // Earlier versions of the same file can never be requested again.
        let current = |k: &SourceId| k.path != id.path || k == id;
        self.datasets.retain(|k| current(k));
        self.reports.retain(|key| current(&key.0));
        Ok(data)
    }

    pub fn filtered(&self, path: &Path, spec: &FilterSpec) -> Result<Table> {
        let data = self.dataset(path)?;
        Ok(filter::apply(&data.table, spec))
    }

    pub fn report(
        &self,
        path: &Path,
        spec: &FilterSpec,
        kind: ReportKind,
    ) -> Result<Arc<Vec<Sheet>>> {
        let id = SourceId::of(path)?;
        let data = self.dataset_for(&id)?;
        let key = (id, spec.clone(), kind);
        self.reports.get_or_try_insert_with(&key, || {
            let table = filter::apply(&data.table, spec);
            info!(report = %kind, filter = %spec.describe(), rows = table.len(), "building report");
            Ok(build_report(kind, &table, &self.params))
        })
    }

    /// Drop every cached dataset and report.
    pub fn refresh(&self) {
        self.datasets.clear();
        self.reports.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use std::fs::{self, File};
    use std::time::Duration;
    use tempfile::TempDir;

    const CSV: &str = indoc! {"
        Corcentric Supplier Name,Category,SubCategory,PO Order Date,Line Item Subtotal,Supplier City/State
        SupplierA,Janitorial,Paper,2024-01-05,1000,\"Austin, TX\"
        SupplierB,Janitorial,Paper,2024-02-05,2000,\"Dallas, TX\"
    "};

    fn write_source(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("po.csv");
        fs::write(&path, CSV).unwrap();
        path
    }

    #[test]
    fn dataset_is_loaded_once_per_window() {
        let dir = TempDir::new().unwrap();
        let path = write_source(&dir);
        let session = Session::new(Config::default());
        let a = session.dataset(&path).unwrap();
        let b = session.dataset(&path).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.table.len(), 2);
    }

    #[test]
    fn modified_file_is_reloaded() {
        let dir = TempDir::new().unwrap();
        let path = write_source(&dir);
        let session = Session::new(Config::default());
        let first = session.dataset(&path).unwrap();

        let extra = format!("{}SupplierC,IT,,2024-03-01,50,\"Reno, NV\"\n", CSV);
        fs::write(&path, extra).unwrap();
        File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(SystemTime::now() + Duration::from_secs(60))
            .unwrap();

        let second = session.dataset(&path).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(second.table.len(), 3);
    }

    #[test]
    fn reports_are_cached_per_filter() {
        let dir = TempDir::new().unwrap();
        let path = write_source(&dir);
        let session = Session::new(Config::default());
        let all = FilterSpec::default();
        let it_only = FilterSpec::default().with_categories(["IT"]);

        let r1 = session.report(&path, &all, ReportKind::RawTransactions).unwrap();
        let r2 = session.report(&path, &all, ReportKind::RawTransactions).unwrap();
        assert!(Arc::ptr_eq(&r1, &r2));
        assert_eq!(r1[0].rows.len(), 2);

        let r3 = session.report(&path, &it_only, ReportKind::RawTransactions).unwrap();
        assert!(r3[0].rows.is_empty());

        session.refresh();
        let r4 = session.report(&path, &all, ReportKind::RawTransactions).unwrap();
        assert!(!Arc::ptr_eq(&r1, &r4));
        assert_eq!(*r1, *r4);
    }

    #[test]
    fn superseded_file_versions_are_evicted() {
        let dir = TempDir::new().unwrap();
        let path = write_source(&dir);
        let session = Session::new(Config::default());
        let filters = [
            FilterSpec::default(),
            FilterSpec::default().with_categories(["Janitorial"]),
            FilterSpec::default().with_categories(["IT"]),
            FilterSpec::default().with_supplier_states(["TX"]),
        ];
        let base = SystemTime::now();
        for i in 1..=5u64 {
            File::options()
                .write(true)
                .open(&path)
                .unwrap()
                .set_modified(base + Duration::from_secs(60 * i))
                .unwrap();
            for spec in &filters {
                session.report(&path, spec, ReportKind::RawTransactions).unwrap();
            }
            assert_eq!(session.datasets.len(), 1);
            assert_eq!(session.reports.len(), filters.len());
        }
    }

    #[test]
    fn missing_source_is_reported() {
        let dir = TempDir::new().unwrap();
        let session = Session::new(Config::default());
        let err = session.dataset(&dir.path().join("absent.csv")).unwrap_err();
        assert!(matches!(err, DashboardError::SourceNotFound { .. }));
        let err = session.dataset(dir.path()).unwrap_err();
        assert!(matches!(err, DashboardError::SourceNotFound { .. }));
    }
}
