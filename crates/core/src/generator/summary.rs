//! Request summary for the json output mode.

use rand::Rng;
use serde_json::{Map, Value};

use crate::catalog::Catalog;
use crate::ticket::Ticket;

use super::config::GeneratorConfig;
use super::schedule::ScheduleWindow;
use super::terraform::GenerateError;

/// Deployment environments carried by a request.
const ENVIRONMENTS: [&str; 3] = ["development", "test", "production"];

/// Complete the ticket's raw fields with the resolved engine details and a
/// drawn schedule.
///
/// Environments whose size field is empty are left out. A size that the
/// engine does not offer is an error.
pub fn request_summary<R: Rng + ?Sized>(
    ticket: &Ticket,
    catalog: &Catalog,
    config: &GeneratorConfig,
    rng: &mut R,
) -> Result<Map<String, Value>, GenerateError> {
    let engine = catalog.engine(&ticket.engine)?;
    let schedule = ScheduleWindow::draw(
        rng,
        config.backup_start_hour,
        config.backup_end_hour,
        config.window_minutes,
        &config.maintenance_day,
    )?;

    let mut summary = ticket.raw.clone();
    summary.insert("action".into(), "rds".into());
    summary.insert("engine".into(), engine.engine.clone().into());
    summary.insert(
        "engine_major_version".into(),
        engine.major_engine_version.clone().into(),
    );
    summary.insert("engine_version".into(), engine.engine_version.clone().into());
    summary.insert("port".into(), engine.port.into());
    summary.insert(
        "enabled_cloudwatch_logs_exports".into(),
        engine.enabled_cloudwatch_logs_exports.join(",").into(),
    );
    summary.insert("backup_window".into(), schedule.backup_window().into());
    summary.insert(
        "maintenance_window".into(),
        schedule.maintenance_window().into(),
    );

    for (environment, tier) in ENVIRONMENTS.iter().zip([
        &ticket.development_size,
        &ticket.test_size,
        &ticket.production_size,
    ]) {
        let Some(tier) = tier else { continue };
        let size = engine.size(&ticket.engine, tier)?;
        summary.insert(
            format!("{}_instance_class", environment),
            size.instance_class.clone().into(),
        );
        summary.insert(
            format!("{}_allocated_storage", environment),
            size.allocated_storage.into(),
        );
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogError;
    use crate::testing::fixtures::sample_ticket;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_summary_fields() {
        let mut ticket = sample_ticket();
        ticket.development_size = Some("small".into());
        ticket.production_size = Some("large".into());
        ticket.test_size = None;

        let mut rng = StdRng::seed_from_u64(8);
        let summary = request_summary(
            &ticket,
            &Catalog::builtin(),
            &GeneratorConfig::default(),
            &mut rng,
        )
        .unwrap();

        assert_eq!(summary["action"], "rds");
        assert_eq!(summary["engine"], "mysql");
        assert_eq!(summary["engine_major_version"], "8.0");
        assert_eq!(summary["port"], 3306);
        assert_eq!(
            summary["enabled_cloudwatch_logs_exports"],
            "error,general,slowquery"
        );
        assert_eq!(summary["development_instance_class"], "db.m5.large");
        assert_eq!(summary["production_allocated_storage"], 300);
        assert!(!summary.contains_key("test_instance_class"));
        // Raw ticket fields pass through.
        assert_eq!(summary["number"], ticket.number.as_str());
    }

    #[test]
    fn test_unknown_environment_size() {
        let mut ticket = sample_ticket();
        ticket.test_size = Some("huge".into());
        let mut rng = StdRng::seed_from_u64(8);
        let err = request_summary(
            &ticket,
            &Catalog::builtin(),
            &GeneratorConfig::default(),
            &mut rng,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            GenerateError::Catalog(CatalogError::UnknownSizeTier { .. })
        ));
    }
}
