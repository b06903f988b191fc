//! Network access rules for a generated database.

use super::document::Node;
use super::naming::ResourceName;

/// One ingress rule admitting TCP traffic on the database port.
fn ingress(description: &str, port: u16, cidr_blocks: Node) -> Node {
    Node::object([
        ("description", description.into()),
        ("from_port", port.into()),
        ("to_port", port.into()),
        ("protocol", "TCP".into()),
        ("cidr_blocks", cidr_blocks),
        ("ipv6_cidr_blocks", Node::empty_list()),
        ("prefix_list_ids", Node::empty_list()),
        ("security_groups", Node::empty_list()),
        ("self", false.into()),
    ])
}

/// Security group body admitting the mid VPC and the management ranges on `port`.
pub fn security_group(name: &ResourceName, network_module: &str, port: u16) -> Node {
    Node::object([
        ("name", format!("{}-SG", name.identifier()).into()),
        ("description", "Allow RDS inbound traffic".into()),
        (
            "vpc_id",
            format!("${{module.{}.back_vpc_id}}", network_module).into(),
        ),
        (
            "ingress",
            Node::list([
                ingress(
                    "Mid VPC",
                    port,
                    Node::list([format!("${{module.{}.mid_vpc_cidr}}", network_module)]),
                ),
                ingress(
                    "DBMW Mgmt",
                    port,
                    name.variable_ref("mgmt_cidr_blocks").into(),
                ),
            ]),
        ),
    ])
}
