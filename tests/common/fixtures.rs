//! Common test fixtures: a programmatic IF-MIB-flavored schema and manager
//! constructors over the scripted mock transport.

use typed_snmp::manager::{Manager, ManagerBuilder};
use typed_snmp::oid;
use typed_snmp::schema::{
    Access, MibDump, ModuleBuilder, NamedValues, Restriction, RowIndex, SchemaNode, SchemaRegistry,
    SmiType,
};
use typed_snmp::snmp::MockTransport;
use typed_snmp::Oid;

// =============================================================================
// Standard system MIB OIDs (1.3.6.1.2.1.1.*)
// =============================================================================

pub fn sys_name_instance() -> Oid {
    oid!(1, 3, 6, 1, 2, 1, 1, 5, 0)
}
pub fn sys_uptime_instance() -> Oid {
    oid!(1, 3, 6, 1, 2, 1, 1, 3, 0)
}

// =============================================================================
// ifTable columns (1.3.6.1.2.1.2.2.1.*)
// =============================================================================

pub fn if_descr_column() -> Oid {
    oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 2)
}
pub fn if_type_column() -> Oid {
    oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 3)
}
pub fn if_phys_address_column() -> Oid {
    oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 6)
}
pub fn if_admin_status_column() -> Oid {
    oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 7)
}

/// Schema covering the shapes the integration tests need: hinted strings,
/// enumerations, a MAC-style fixed-width hint, and an integer-indexed table.
pub fn fixture_registry() -> SchemaRegistry {
    let system = oid!(1, 3, 6, 1, 2, 1, 1);
    let entry = oid!(1, 3, 6, 1, 2, 1, 2, 2, 1);

    let module = ModuleBuilder::new("FIXTURE-MIB")
        .node(SchemaNode::interior("system", system.clone()))
        .node(
            SchemaNode::scalar("sysUpTime", system.child(3), SmiType::TimeTicks)
                .with_convention("TimeTicks")
                .with_access(Access::ReadOnly),
        )
        .node(
            SchemaNode::scalar("sysName", system.child(5), SmiType::OctetString)
                .with_convention("DisplayString")
                .with_hint("255a")
                .with_restriction(Restriction::Ranges(vec![(0, 255)]))
                .with_access(Access::ReadWrite),
        )
        .node(SchemaNode::table("ifTable", oid!(1, 3, 6, 1, 2, 1, 2, 2)))
        .node(SchemaNode::row(
            "ifEntry",
            entry.clone(),
            RowIndex::Columns {
                names: vec!["ifIndex".into()],
                implied: false,
            },
        ))
        .node(
            SchemaNode::column("ifIndex", entry.child(1), SmiType::Integer32)
                .with_access(Access::NotAccessible),
        )
        .node(
            SchemaNode::column("ifDescr", entry.child(2), SmiType::OctetString)
                .with_convention("DisplayString")
                .with_hint("255a")
                .with_access(Access::ReadOnly),
        )
        .node(
            SchemaNode::column("ifType", entry.child(3), SmiType::Integer32)
                .with_named(NamedValues::new(vec![
                    (1, "other"),
                    (6, "ethernetCsmacd"),
                    (24, "softwareLoopback"),
                ]))
                .with_access(Access::ReadOnly),
        )
        .node(
            SchemaNode::column("ifPhysAddress", entry.child(6), SmiType::OctetString)
                .with_convention("PhysAddress")
                .with_hint("1x:")
                .with_access(Access::ReadOnly),
        )
        .node(
            SchemaNode::column("ifAdminStatus", entry.child(7), SmiType::Integer32)
                .with_named(NamedValues::new(vec![(1, "up"), (2, "down"), (3, "testing")]))
                .with_access(Access::ReadWrite),
        )
        .build();

    let mut registry = SchemaRegistry::new(MibDump::new().with(module));
    registry
        .load_module("FIXTURE-MIB")
        .expect("fixture module loads");
    registry
}

/// Manager with default policy over the given mock.
pub fn fixture_manager(mock: &MockTransport) -> Manager<MockTransport> {
    Manager::new(mock.clone(), fixture_registry())
}

/// Manager built from a customized builder over the given mock.
pub fn fixture_manager_with(
    mock: &MockTransport,
    builder: ManagerBuilder,
) -> Manager<MockTransport> {
    builder
        .build(mock.clone(), fixture_registry())
        .expect("fixture manager builds")
}
