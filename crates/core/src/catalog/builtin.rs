//! Builtin engine presets.

use std::collections::BTreeMap;

use super::{Catalog, EngineProfile, SizeProfile};

fn sizes(small: u32, medium: u32, large: u32) -> BTreeMap<String, SizeProfile> {
    [
        ("small", "db.m5.large", small),
        ("medium", "db.m5.xlarge", medium),
        ("large", "db.m5.2xlarge", large),
    ]
    .into_iter()
    .map(|(tier, class, storage)| {
        (
            tier.to_string(),
            SizeProfile {
                instance_class: class.to_string(),
                allocated_storage: storage,
            },
        )
    })
    .collect()
}

#[allow(clippy::too_many_arguments)]
fn profile(
    description: &str,
    engine: &str,
    engine_version: &str,
    family: &str,
    major: &str,
    port: u16,
    logs: &[&str],
    sizes: BTreeMap<String, SizeProfile>,
) -> EngineProfile {
    EngineProfile {
        description: description.to_string(),
        engine: engine.to_string(),
        engine_version: engine_version.to_string(),
        family: family.to_string(),
        major_engine_version: major.to_string(),
        port,
        enabled_cloudwatch_logs_exports: logs.iter().map(|l| l.to_string()).collect(),
        sizes,
    }
}

pub(super) fn builtin_catalog() -> Catalog {
    let mut engines = BTreeMap::new();

    engines.insert(
        "mysql5.7".to_string(),
        profile(
            "MySQL Community Edition",
            "mysql",
            "5.7.28",
            "mysql5.7",
            "5.7",
            3306,
            &["audit", "error", "general", "slowquery"],
            sizes(50, 100, 300),
        ),
    );
    engines.insert(
        "mysql8.0".to_string(),
        profile(
            "MySQL Community Edition",
            "mysql",
            "8.0.17",
            "mysql8.0",
            "8.0",
            3306,
            &["error", "general", "slowquery"],
            sizes(50, 100, 300),
        ),
    );
    engines.insert(
        "postgres11".to_string(),
        profile(
            "PostgreSQL",
            "postgres",
            "11.6",
            "postgres11",
            "11",
            5432,
            &["postgresql", "upgrade"],
            sizes(20, 40, 100),
        ),
    );
    engines.insert(
        "postgres12".to_string(),
        profile(
            "PostgreSQL",
            "postgres",
            "12.2",
            "postgres12",
            "12",
            5432,
            &["postgresql", "upgrade"],
            sizes(20, 40, 100),
        ),
    );

    Catalog::new(engines)
}
