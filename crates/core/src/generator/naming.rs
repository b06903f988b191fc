//! Resource naming tokens.

use once_cell::sync::Lazy;
use regex_lite::Regex;

/// Runs of characters Terraform identifiers may not contain.
static SEPARATORS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9]+").expect("valid separator pattern"));

/// The separator every disallowed run collapses to.
pub const TOKEN_SEPARATOR: &str = "_";

/// Prepended to tokens that would start with a digit.
pub const DIGIT_PREFIX: &str = "db_";

/// Normalize a ticket identifier into a naming token.
///
/// `test-rds` becomes `test_rds`, `a--b.c` becomes `a_b_c`. Terraform
/// labels cannot start with a digit, so `2024-orders` becomes `db_2024_orders`.
pub fn normalize_identifier(identifier: &str) -> String {
    let token = SEPARATORS.replace_all(identifier.trim(), TOKEN_SEPARATOR);
    if token.starts_with(|c: char| c.is_ascii_digit()) {
        format!("{}{}", DIGIT_PREFIX, token)
    } else {
        token.into_owned()
    }
}

/// A ticket identifier together with its naming token.
///
/// The raw identifier names cloud objects (security group, snapshot, role),
/// the token keys every block of the document and every interpolation
/// between them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceName {
    identifier: String,
    token: String,
}

impl ResourceName {
    pub fn new(identifier: &str) -> Self {
        Self {
            identifier: identifier.trim().to_string(),
            token: normalize_identifier(identifier),
        }
    }

    /// The identifier as requested.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// The normalized token.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Name of a variable scoped to this resource.
    pub fn variable(&self, suffix: &str) -> String {
        format!("{}_{}", self.token, suffix)
    }

    /// Interpolation of a variable scoped to this resource.
    pub fn variable_ref(&self, suffix: &str) -> String {
        format!("${{var.{}}}", self.variable(suffix))
    }

    /// Interpolation of an attribute of a resource keyed by this token.
    pub fn resource_ref(&self, kind: &str, attribute: &str) -> String {
        format!("${{{}.{}.{}}}", kind, self.token, attribute)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_dash() {
        assert_eq!(normalize_identifier("test-rds"), "test_rds");
    }

    #[test]
    fn test_normalize_collapses_runs() {
        assert_eq!(normalize_identifier("app--db.prod"), "app_db_prod");
        assert_eq!(normalize_identifier("a - b"), "a_b");
        assert_eq!(normalize_identifier("a__b"), "a_b");
    }

    #[test]
    fn test_normalize_leading_digit() {
        assert_eq!(normalize_identifier("2024-orders"), "db_2024_orders");
        assert_eq!(normalize_identifier(" 9db"), "db_9db");
        assert_eq!(normalize_identifier("orders-2024"), "orders_2024");
    }

    #[test]
    fn test_normalize_keeps_clean_identifier() {
        assert_eq!(normalize_identifier("orders_db1"), "orders_db1");
    }

    #[test]
    fn test_resource_name_references() {
        let name = ResourceName::new("test-rds");
        assert_eq!(name.identifier(), "test-rds");
        assert_eq!(name.token(), "test_rds");
        assert_eq!(name.variable("db_password"), "test_rds_db_password");
        assert_eq!(name.variable_ref("db_password"), "${var.test_rds_db_password}");
        assert_eq!(
            name.resource_ref("aws_kms_key", "arn"),
            "${aws_kms_key.test_rds.arn}"
        );
    }
}
