//! Lazy exchange iterators over the numeric resources.
//!
//! Each iterator owns an open cursor into its resource. None of them can be
//! rewound: they are consumed by value, once, by whatever writes the database.

use std::collections::VecDeque;

use lcigrid_core::{Exchange, ExchangeKind, Key};

use crate::engine::Reconciliation;
use crate::error::SourceError;
use crate::source::{
    ObservationSource, Observations, EXTENSION_EXCHANGES, PRODUCTION_EXCHANGES,
    TECHNOSPHERE_EXCHANGES,
};

/// Production exchanges. A missing amount means 1; an explicit 0 stays 0.
pub struct ProductionExchanges {
    db_name: String,
    rows: Observations,
}

impl Iterator for ProductionExchanges {
    type Item = Result<Exchange, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        let obs = match self.rows.next()? {
            Ok(obs) => obs,
            Err(e) => return Some(Err(e)),
        };
        let activity = Key::new(self.db_name.as_str(), obs.col.id.as_str());
        Some(Ok(Exchange {
            input: activity.clone(),
            output: activity,
            kind: ExchangeKind::Production,
            amount: obs.amount.unwrap_or(1.0),
        }))
    }
}

/// Technosphere exchanges from the input-output table. Amounts are required.
pub struct TechnosphereExchanges {
    db_name: String,
    rows: Observations,
}

impl Iterator for TechnosphereExchanges {
    type Item = Result<Exchange, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        let obs = match self.rows.next()? {
            Ok(obs) => obs,
            Err(e) => return Some(Err(e)),
        };
        let Some(amount) = obs.amount else {
            return Some(Err(SourceError::MissingAmount {
                resource: TECHNOSPHERE_EXCHANGES.into(),
                row: obs.row.id.clone(),
                col: obs.col.id.clone(),
            }));
        };
        let activity = Key::new(self.db_name.as_str(), obs.col.id.as_str());
        Some(Ok(Exchange {
            input: activity.clone(),
            output: activity,
            kind: ExchangeKind::Technosphere,
            amount,
        }))
    }
}

/// Biosphere exchanges, fanned out through the reconciliation map.
///
/// One observation yields one exchange per surviving `(canonical flow, scale)`
/// link, in link order, with `amount = observed * scale`. Observations of
/// unmapped flows yield nothing.
pub struct BiosphereExchanges {
    db_name: String,
    rows: Observations,
    reconciliation: Reconciliation,
    pending: VecDeque<Exchange>,
}

impl Iterator for BiosphereExchanges {
    type Item = Result<Exchange, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(exchange) = self.pending.pop_front() {
                return Some(Ok(exchange));
            }

            let obs = match self.rows.next()? {
                Ok(obs) => obs,
                Err(e) => return Some(Err(e)),
            };
            let links = self.reconciliation.links_for(&obs.row);
            if links.is_empty() {
                continue;
            }
            let Some(amount) = obs.amount else {
                return Some(Err(SourceError::MissingAmount {
                    resource: EXTENSION_EXCHANGES.into(),
                    row: obs.row.id.clone(),
                    col: obs.col.id.clone(),
                }));
            };
            let output = Key::new(self.db_name.as_str(), obs.col.id.as_str());
            self.pending.extend(links.iter().map(|(canonical, scale)| Exchange {
                input: canonical.clone(),
                output: output.clone(),
                kind: ExchangeKind::Biosphere,
                amount: amount * scale,
            }));
        }
    }
}

/// Every exchange of an import: production, then biosphere, then
/// technosphere.
///
/// Single pass only. The stream is built from freshly opened cursors and
/// takes ownership of the reconciliation map, so it is consumed by value and
/// cannot be iterated twice.
pub struct ExchangeStream {
    inner: std::iter::Chain<
        std::iter::Chain<ProductionExchanges, BiosphereExchanges>,
        TechnosphereExchanges,
    >,
}

impl ExchangeStream {
    /// Open all three numeric resources. A missing resource fails here,
    /// before anything is emitted.
    pub fn open(
        source: &dyn ObservationSource,
        db_name: &str,
        reconciliation: Reconciliation,
    ) -> Result<Self, SourceError> {
        let production = ProductionExchanges {
            db_name: db_name.to_string(),
            rows: source.observations(PRODUCTION_EXCHANGES)?,
        };
        let biosphere = BiosphereExchanges {
            db_name: db_name.to_string(),
            rows: source.observations(EXTENSION_EXCHANGES)?,
            reconciliation,
            pending: VecDeque::new(),
        };
        let technosphere = TechnosphereExchanges {
            db_name: db_name.to_string(),
            rows: source.observations(TECHNOSPHERE_EXCHANGES)?,
        };
        Ok(Self {
            inner: production.chain(biosphere).chain(technosphere),
        })
    }
}

impl Iterator for ExchangeStream {
    type Item = Result<Exchange, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::migration::{MigrationData, MigrationTable};
    use crate::registry::CanonicalRegistry;
    use crate::source::{MemorySource, MetadataRecord, Observation};
    use lcigrid_core::{Categories, Flow, FlowKind};

    fn obs(row: &Rc<MetadataRecord>, col: &Rc<MetadataRecord>, amount: Option<f64>) -> Observation {
        Observation { row: Rc::clone(row), col: Rc::clone(col), amount }
    }

    fn lead_reconciliation(extensions: &[MetadataRecord]) -> Reconciliation {
        let data: MigrationData = serde_json::from_str(
            r#"{"data": [[["Lead ores", "air"], [
                {"name": "Lead", "categories": ["air"], "amount": 0.5},
                {"name": "Lead", "categories": ["air", "urban"], "amount": 0.5}
            ]]]}"#,
        )
        .unwrap();
        let migrations = MigrationTable::from_data(data).unwrap();
        let registry = CanonicalRegistry::build([Flow {
            key: Key::new("biosphere3", "lead-air"),
            name: "Lead".into(),
            categories: Categories::new(["air"]),
            unit: Some("kilogram".into()),
            kind: FlowKind::Biosphere,
        }])
        .unwrap();
        Reconciliation::build(extensions, &migrations, &registry)
    }

    #[test]
    fn production_defaults_missing_amount_to_one() {
        let product = Rc::new(MetadataRecord::new("p1", "Steel"));
        let activity = Rc::new(MetadataRecord::new("a1", "Steel production"));
        let source = MemorySource::new()
            .with_observations(PRODUCTION_EXCHANGES, vec![obs(&product, &activity, None)])
            .with_observations(EXTENSION_EXCHANGES, vec![])
            .with_observations(TECHNOSPHERE_EXCHANGES, vec![obs(&product, &activity, Some(-0.2))]);

        let exchanges: Vec<_> = ExchangeStream::open(&source, "EXIO", Reconciliation::default())
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(exchanges.len(), 2);
        assert_eq!(exchanges[0].kind, ExchangeKind::Production);
        assert_eq!(exchanges[0].amount, 1.0);
        assert_eq!(exchanges[0].input, Key::new("EXIO", "a1"));
        assert_eq!(exchanges[0].output, Key::new("EXIO", "a1"));
        assert_eq!(exchanges[1].kind, ExchangeKind::Technosphere);
        assert_eq!(exchanges[1].amount, -0.2);
    }

    #[test]
    fn explicit_zero_production_amount_is_kept() {
        let product = Rc::new(MetadataRecord::new("p1", "Steel"));
        let activity = Rc::new(MetadataRecord::new("a1", "Steel production"));
        let source = MemorySource::new()
            .with_observations(PRODUCTION_EXCHANGES, vec![obs(&product, &activity, Some(0.0))])
            .with_observations(EXTENSION_EXCHANGES, vec![])
            .with_observations(TECHNOSPHERE_EXCHANGES, vec![]);

        let exchanges: Vec<_> = ExchangeStream::open(&source, "EXIO", Reconciliation::default())
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(exchanges.len(), 1);
        assert_eq!(exchanges[0].amount, 0.0);
    }

    #[test]
    fn biosphere_fan_out_follows_observation_then_link_order() {
        let lead = Rc::new(MetadataRecord::new("e1", "Lead ores").with_field("compartment", "air"));
        let a1 = Rc::new(MetadataRecord::new("a1", "Mining"));
        let a2 = Rc::new(MetadataRecord::new("a2", "Smelting"));
        let reconciliation = lead_reconciliation(&[(*lead).clone()]);

        let source = MemorySource::new()
            .with_observations(PRODUCTION_EXCHANGES, vec![])
            .with_observations(
                EXTENSION_EXCHANGES,
                vec![obs(&lead, &a2, Some(10.0)), obs(&lead, &a1, Some(4.0))],
            )
            .with_observations(TECHNOSPHERE_EXCHANGES, vec![]);

        let exchanges: Vec<_> = ExchangeStream::open(&source, "EXIO", reconciliation)
            .unwrap()
            .map(Result::unwrap)
            .collect();

        assert_eq!(exchanges.len(), 2);
        assert_eq!(exchanges[0].output, Key::new("EXIO", "a2"));
        assert_eq!(exchanges[0].amount, 5.0);
        assert_eq!(exchanges[1].output, Key::new("EXIO", "a1"));
        assert_eq!(exchanges[1].amount, 2.0);
        assert!(exchanges.iter().all(|e| e.input == Key::new("biosphere3", "lead-air")));
    }

    #[test]
    fn unmapped_biosphere_rows_emit_nothing_even_without_amount() {
        let unknown = Rc::new(MetadataRecord::new("e9", "Employment"));
        let a1 = Rc::new(MetadataRecord::new("a1", "Mining"));
        let source = MemorySource::new()
            .with_observations(PRODUCTION_EXCHANGES, vec![])
            .with_observations(EXTENSION_EXCHANGES, vec![obs(&unknown, &a1, None)])
            .with_observations(TECHNOSPHERE_EXCHANGES, vec![]);

        let mut stream = ExchangeStream::open(&source, "EXIO", Reconciliation::default()).unwrap();
        assert!(stream.next().is_none());
    }

    #[test]
    fn technosphere_without_amount_is_an_error() {
        let p = Rc::new(MetadataRecord::new("p1", "Steel"));
        let a = Rc::new(MetadataRecord::new("a1", "Steel production"));
        let source = MemorySource::new()
            .with_observations(PRODUCTION_EXCHANGES, vec![])
            .with_observations(EXTENSION_EXCHANGES, vec![])
            .with_observations(TECHNOSPHERE_EXCHANGES, vec![obs(&p, &a, None)]);

        let mut stream = ExchangeStream::open(&source, "EXIO", Reconciliation::default()).unwrap();
        assert!(matches!(stream.next(), Some(Err(SourceError::MissingAmount { .. }))));
    }

    #[test]
    fn missing_resource_fails_before_streaming() {
        let source = MemorySource::new().with_observations(PRODUCTION_EXCHANGES, vec![]);
        let err = ExchangeStream::open(&source, "EXIO", Reconciliation::default()).err().unwrap();
        assert!(matches!(err, SourceError::MissingResource(ref r) if r == EXTENSION_EXCHANGES));
    }
}
