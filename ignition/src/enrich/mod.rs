//! Sequential, fail-fast enrichment of record lists.
//!
//! Records are processed strictly one at a time (each operation completes
//! before the next record starts) to bound load on the external dependency
//! being called. There is deliberately no concurrent fan-out.

use std::fmt;
use std::future::Future;

/// The failure of one record's enrichment, wrapped with the record's
/// identifier for diagnosability.
#[derive(Debug)]
pub struct EnrichmentError<E> {
    /// Display label of the failing record.
    pub record: String,
    /// Zero-based position of the failing record.
    pub index: usize,
    /// The operation's error.
    pub source: E,
}

impl<E: fmt::Display> fmt::Display for EnrichmentError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "enrichment failed for {}: {}", self.record, self.source)
    }
}

impl<E: fmt::Display + fmt::Debug> std::error::Error for EnrichmentError<E> {}

/// Applies `op` to each record in order, waiting for each to complete
/// before starting the next.
///
/// On the first record whose operation fails, processing stops
/// immediately (records after it are never attempted) and the failure is
/// returned wrapped with the label `label` produced for that record. On
/// success of every record the fully enriched list is returned; each
/// record is moved through the operation and back, so enrichment results
/// are visible to whatever consumes the list.
pub async fn enrich_in_order<R, E, L, F, Fut>(
    records: Vec<R>,
    label: L,
    mut op: F,
) -> Result<Vec<R>, EnrichmentError<E>>
where
    L: Fn(&R) -> String,
    F: FnMut(R) -> Fut,
    Fut: Future<Output = Result<R, E>>,
{
    let mut enriched = Vec::with_capacity(records.len());

    for (index, record) in records.into_iter().enumerate() {
        let record_label = label(&record);
        match op(record).await {
            Ok(record) => enriched.push(record),
            Err(source) => {
                return Err(EnrichmentError {
                    record: record_label,
                    index,
                    source,
                })
            }
        }
    }

    Ok(enriched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Record {
        name: &'static str,
        enriched: bool,
    }

    fn record(name: &'static str) -> Record {
        Record {
            name,
            enriched: false,
        }
    }

    #[tokio::test]
    async fn enriches_every_record_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let observer = Arc::clone(&seen);

        let records = vec![record("r1"), record("r2"), record("r3")];
        let enriched = enrich_in_order(
            records,
            |r| r.name.to_string(),
            |mut r| {
                let observer = Arc::clone(&observer);
                async move {
                    observer.lock().push(r.name);
                    r.enriched = true;
                    Ok::<_, String>(r)
                }
            },
        )
        .await
        .unwrap();

        assert_eq!(*seen.lock(), vec!["r1", "r2", "r3"]);
        assert!(enriched.iter().all(|r| r.enriched));
    }

    #[tokio::test]
    async fn stops_at_the_first_failure_and_names_the_record() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let observer = Arc::clone(&seen);

        let records = vec![record("r1"), record("r2"), record("r3")];
        let err = enrich_in_order(
            records,
            |r| r.name.to_string(),
            |r| {
                let observer = Arc::clone(&observer);
                async move {
                    observer.lock().push(r.name);
                    if r.name == "r2" {
                        Err("boom".to_string())
                    } else {
                        Ok(r)
                    }
                }
            },
        )
        .await
        .unwrap_err();

        // r3 is never attempted.
        assert_eq!(*seen.lock(), vec!["r1", "r2"]);
        assert_eq!(err.record, "r2");
        assert_eq!(err.index, 1);
        assert_eq!(err.source, "boom");
        assert!(err.to_string().contains("r2"));
    }

    #[tokio::test]
    async fn an_empty_list_is_a_success() {
        let enriched: Vec<Record> = enrich_in_order(
            Vec::new(),
            |r: &Record| r.name.to_string(),
            |r| async move { Ok::<_, String>(r) },
        )
        .await
        .unwrap();

        assert!(enriched.is_empty());
    }
}
