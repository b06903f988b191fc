//! Terraform document generation.

use std::collections::BTreeMap;

use rand::Rng;
use thiserror::Error;
use tracing::{debug, info};

use crate::catalog::{Catalog, CatalogError, EngineProfile, SizeProfile};
use crate::ticket::Ticket;

use super::config::GeneratorConfig;
use super::document::{ConfigDocument, DocumentError, Node};
use super::naming::ResourceName;
use super::schedule::{ScheduleError, ScheduleWindow};
use super::security_group::security_group;

/// Errors raised while generating a document.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error("generated document is inconsistent: {0}")]
    Document(#[from] DocumentError),

    #[error("empty port range {min}..{max}")]
    EmptyPortRange { min: u16, max: u16 },
}

/// Draw a port from `[min, max)`.
pub fn random_port<R: Rng + ?Sized>(rng: &mut R, min: u16, max: u16) -> Result<u16, GenerateError> {
    if max <= min {
        return Err(GenerateError::EmptyPortRange { min, max });
    }
    Ok(rng.gen_range(min..max))
}

/// Values drawn for one generation run.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Draws {
    port: u16,
    schedule: ScheduleWindow,
}

/// Generate the infrastructure document for a ticket.
///
/// The port is drawn before the schedule, so a seeded `rng` reproduces the
/// same document.
pub fn generate<R: Rng + ?Sized>(
    ticket: &Ticket,
    catalog: &Catalog,
    config: &GeneratorConfig,
    rng: &mut R,
) -> Result<ConfigDocument, GenerateError> {
    let name = ResourceName::new(&ticket.identifier);
    let (engine, size) = catalog.resolve(&ticket.engine, &ticket.size)?;

    let draws = Draws {
        port: random_port(rng, config.port_min, config.port_max)?,
        schedule: ScheduleWindow::draw(
            rng,
            config.backup_start_hour,
            config.backup_end_hour,
            config.window_minutes,
            &config.maintenance_day,
        )?,
    };
    debug!(
        ticket = %ticket.number,
        port = draws.port,
        backup_window = %draws.schedule.backup_window(),
        "Drew port and schedule"
    );

    let mut root = BTreeMap::new();
    root.insert("variable".to_string(), variables(&name));
    root.insert(
        "module".to_string(),
        Node::object([(
            name.token(),
            rds_module(ticket, &name, engine, size, config, &draws),
        )]),
    );
    root.insert("resource".to_string(), resources(&name, config, draws.port));

    let document = ConfigDocument::from_sections(root);
    document.validate(&[config.network_module.as_str()])?;

    info!(
        ticket = %ticket.number,
        token = %name.token(),
        engine = %engine.family,
        size = %ticket.size,
        "Generated terraform document"
    );
    Ok(document)
}

fn variables(name: &ResourceName) -> Node {
    Node::list([
        Node::object([(
            name.variable("db_password"),
            Node::object([
                ("type", "string".into()),
                ("description", "(required) RDS user password".into()),
            ]),
        )]),
        Node::object([(
            name.variable("mgmt_cidr_blocks"),
            Node::object([
                ("type", "list(string)".into()),
                (
                    "description",
                    "(optional) List of CIDR blocks from which to manage RDS".into(),
                ),
                ("default", Node::empty_list()),
            ]),
        )]),
    ])
}

fn rds_module(
    ticket: &Ticket,
    name: &ResourceName,
    engine: &EngineProfile,
    size: &SizeProfile,
    config: &GeneratorConfig,
    draws: &Draws,
) -> Node {
    let defaults = &config.module_defaults;
    let id = name.identifier();

    let mut module: BTreeMap<String, Node> = BTreeMap::new();
    let mut set = |key: &str, value: Node| {
        module.insert(key.to_string(), value);
    };

    set("source", defaults.source.as_str().into());
    set("version", defaults.version.as_str().into());
    set("backup_retention_period", defaults.backup_retention_period.into());
    set("create_db_option_group", defaults.create_db_option_group.into());
    set("create_db_parameter_group", defaults.create_db_parameter_group.into());
    set("create_monitoring_role", defaults.create_monitoring_role.into());
    set("deletion_protection", defaults.deletion_protection.into());
    set("publicly_accessible", defaults.publicly_accessible.into());
    set("storage_encrypted", defaults.storage_encrypted.into());
    set(
        "monitoring_interval",
        ticket
            .monitoring_interval
            .unwrap_or(defaults.monitoring_interval)
            .into(),
    );
    set(
        "performance_insights_enabled",
        ticket
            .performance_insights_enabled
            .unwrap_or(defaults.performance_insights_enabled)
            .into(),
    );
    set(
        "performance_insights_retention_period",
        ticket
            .performance_insights_retention_period
            .unwrap_or(defaults.performance_insights_retention_period)
            .into(),
    );

    set("identifier", id.into());
    set("engine", engine.engine.as_str().into());
    set("engine_version", engine.engine_version.as_str().into());
    set("major_engine_version", engine.major_engine_version.as_str().into());
    set("family", engine.family.as_str().into());
    set(
        "enabled_cloudwatch_logs_exports",
        Node::list(engine.enabled_cloudwatch_logs_exports.iter()),
    );
    set("instance_class", size.instance_class.as_str().into());
    set("allocated_storage", size.allocated_storage.into());
    set(
        "max_allocated_storage",
        Node::Number(i64::from(size.allocated_storage) * 3),
    );

    set("name", ticket.name.as_str().into());
    set("username", ticket.username.as_str().into());
    set("password", name.variable_ref("db_password").into());
    set("kms_key_id", name.resource_ref("aws_kms_key", "arn").into());
    set("port", draws.port.into());
    set("backup_window", draws.schedule.backup_window().into());
    set("maintenance_window", draws.schedule.maintenance_window().into());
    set("final_snapshot_identifier", format!("{}-final-snapshot", id).into());
    set("monitoring_role_name", format!("{}-monitoring-role", id).into());
    set(
        "vpc_security_group_ids",
        Node::list([name.resource_ref("aws_security_group", "id")]),
    );

    if ticket.multi_az {
        set("multi_az", true.into());
        set(
            "subnet_ids",
            format!("${{module.{}.back_vpc_subnet_ids}}", config.network_module).into(),
        );
    }

    Node::Map(module)
}

fn resources(name: &ResourceName, config: &GeneratorConfig, port: u16) -> Node {
    let id = name.identifier();
    let token = name.token();

    let mut by_kind = vec![
        (
            "aws_security_group",
            Node::object([(token, security_group(name, &config.network_module, port))]),
        ),
        (
            "aws_kms_key",
            Node::object([(
                token,
                Node::object([
                    ("description", format!("{} RDS KMS Key", id).into()),
                    ("enable_key_rotation", true.into()),
                ]),
            )]),
        ),
        (
            "aws_kms_alias",
            Node::object([(
                token,
                Node::object([
                    ("name", format!("alias/{}", token).into()),
                    (
                        "target_key_id",
                        name.resource_ref("aws_kms_key", "key_id").into(),
                    ),
                ]),
            )]),
        ),
    ];

    if config.password_parameter {
        by_kind.push((
            "aws_ssm_parameter",
            Node::object([(
                name.variable("password"),
                Node::object([
                    ("name", format!("/database/password/{}", id).into()),
                    ("description", format!("{} RDS Master Password", id).into()),
                    ("type", "SecureString".into()),
                    ("value", name.variable_ref("db_password").into()),
                    ("key_id", name.resource_ref("aws_kms_key", "arn").into()),
                ]),
            )]),
        ));
    }

    Node::list([Node::object(by_kind)])
}
