//! End-to-end manager behavior against the scripted mock transport.

mod common;

use std::time::Duration;

use common::*;
use typed_snmp::error::{Error, ErrorStatus, ExceptionKind, SchemaErrorKind};
use typed_snmp::manager::Manager;
use typed_snmp::oid;
use typed_snmp::schema::{MibDump, ModuleBuilder, SchemaNode, SchemaRegistry, SmiType};
use typed_snmp::snmp::{MockTransport, PduKind, PduResponse, VarBind, Version};
use typed_snmp::{Oid, WireValue};

fn vb(oid: Oid, value: WireValue) -> VarBind {
    VarBind::new(oid, value)
}

#[tokio::test]
async fn bulk_pagination_yields_rows_in_index_order() {
    let mock = MockTransport::new();
    let descr = if_descr_column();
    // 5 rows with page size 2: ceil(5/2) = 3 GETBULK requests, truncated at
    // the next column.
    mock.queue_response(PduResponse::ok(vec![
        vb(descr.child(1), WireValue::OctetString(b"lo".as_ref().into())),
        vb(descr.child(2), WireValue::OctetString(b"eth0".as_ref().into())),
    ]));
    mock.queue_response(PduResponse::ok(vec![
        vb(descr.child(3), WireValue::OctetString(b"eth1".as_ref().into())),
        vb(descr.child(4), WireValue::OctetString(b"eth2".as_ref().into())),
    ]));
    mock.queue_response(PduResponse::ok(vec![
        vb(descr.child(5), WireValue::OctetString(b"eth3".as_ref().into())),
        vb(if_type_column().child(1), WireValue::Integer(24)),
    ]));

    let manager = fixture_manager_with(&mock, Manager::<MockTransport>::builder().bulk(2));
    let cells = manager.column("ifDescr").unwrap().iter().await.unwrap();

    let indices: Vec<String> = cells.iter().map(|(index, _)| index.to_string()).collect();
    assert_eq!(indices, ["1", "2", "3", "4", "5"]);
    assert_eq!(cells[4].1.as_str(), Some("eth3"));
    assert_eq!(mock.request_count(), 3);
    assert!(mock.requests().iter().all(|r| matches!(
        r.kind,
        PduKind::GetBulk {
            max_repetitions: 2,
            ..
        }
    )));
}

#[tokio::test]
async fn set_errors_surface_agent_status() {
    // notWritable
    let mock = MockTransport::new();
    mock.queue_response(PduResponse::error(
        ErrorStatus::NotWritable,
        1,
        vec![vb(sys_name_instance(), WireValue::Null)],
    ));
    let manager = fixture_manager(&mock);
    let err = manager
        .scalar("sysName")
        .unwrap()
        .set("denied")
        .await
        .unwrap_err();
    assert!(err.is_status(ErrorStatus::NotWritable));

    // noSuchName (v1 agents)
    let mock = MockTransport::new();
    mock.queue_response(PduResponse::error(
        ErrorStatus::NoSuchName,
        1,
        vec![vb(sys_name_instance(), WireValue::Null)],
    ));
    let manager = fixture_manager_with(&mock, Manager::<MockTransport>::builder().version(Version::V1));
    let err = manager
        .scalar("sysName")
        .unwrap()
        .set("denied")
        .await
        .unwrap_err();
    assert!(err.is_status(ErrorStatus::NoSuchName));
}

#[tokio::test]
async fn cache_expires_after_ttl() {
    let mock = MockTransport::new();
    for _ in 0..2 {
        mock.queue_response(PduResponse::ok(vec![vb(
            sys_uptime_instance(),
            WireValue::TimeTicks(100),
        )]));
    }

    let manager = fixture_manager_with(
        &mock,
        Manager::<MockTransport>::builder().cache(Duration::from_millis(10)),
    );
    let uptime = manager.scalar("sysUpTime").unwrap();
    uptime.get().await.unwrap();
    uptime.get().await.unwrap();
    assert_eq!(mock.request_count(), 1);

    std::thread::sleep(Duration::from_millis(30));
    uptime.get().await.unwrap();
    assert_eq!(mock.request_count(), 2);
}

#[tokio::test]
async fn loose_and_none_are_independent() {
    let unmapped = if_type_column().child(1);

    // strict decode: an unmapped enumeration integer is an error.
    let mock = MockTransport::new();
    mock.queue_response(PduResponse::ok(vec![vb(
        unmapped.clone(),
        WireValue::Integer(99),
    )]));
    let manager = fixture_manager(&mock);
    let column = manager.column("ifType").unwrap();
    let index = column.index(vec![1i64.into()]).unwrap();
    assert!(matches!(
        column.get(&index).await.unwrap_err(),
        Error::Validation { .. }
    ));

    // loose decode: the raw integer is surfaced without a label.
    let mock = MockTransport::new();
    mock.queue_response(PduResponse::ok(vec![vb(
        unmapped.clone(),
        WireValue::Integer(99),
    )]));
    let manager = fixture_manager_with(&mock, Manager::<MockTransport>::builder().loose(true));
    let column = manager.column("ifType").unwrap();
    let index = column.index(vec![1i64.into()]).unwrap();
    let value = column.get(&index).await.unwrap().unwrap();
    assert_eq!(value.as_i64(), Some(99));
    assert_eq!(value.enum_label(), None);

    // loose does not change exception handling: still an error without none.
    let mock = MockTransport::new();
    mock.queue_response(PduResponse::ok(vec![vb(
        sys_name_instance(),
        WireValue::NoSuchInstance,
    )]));
    let manager = fixture_manager_with(&mock, Manager::<MockTransport>::builder().loose(true));
    let err = manager.scalar("sysName").unwrap().get().await.unwrap_err();
    assert_eq!(err.exception_kind(), Some(ExceptionKind::NoSuchInstance));

    // none does not change enum strictness: exception is absent, unmapped
    // integer still errors.
    let mock = MockTransport::new();
    mock.queue_response(PduResponse::ok(vec![vb(
        sys_name_instance(),
        WireValue::NoSuchInstance,
    )]));
    mock.queue_response(PduResponse::ok(vec![vb(
        unmapped.clone(),
        WireValue::Integer(99),
    )]));
    let manager = fixture_manager_with(&mock, Manager::<MockTransport>::builder().none_values(true));
    assert_eq!(manager.scalar("sysName").unwrap().get().await.unwrap(), None);
    let column = manager.column("ifType").unwrap();
    let index = column.index(vec![1i64.into()]).unwrap();
    assert!(matches!(
        column.get(&index).await.unwrap_err(),
        Error::Validation { .. }
    ));
}

#[tokio::test]
async fn v1_walks_use_getnext_and_treat_no_such_name_as_end() {
    let mock = MockTransport::new();
    let descr = if_descr_column();
    mock.queue_response(PduResponse::ok(vec![vb(
        descr.child(1),
        WireValue::OctetString(b"lo".as_ref().into()),
    )]));
    // End of the v1 MIB view: noSuchName instead of an exception varbind.
    mock.queue_response(PduResponse::error(
        ErrorStatus::NoSuchName,
        1,
        vec![vb(descr.child(1), WireValue::Null)],
    ));

    let manager = fixture_manager_with(&mock, Manager::<MockTransport>::builder().version(Version::V1));
    let cells = manager.column("ifDescr").unwrap().iter().await.unwrap();
    assert_eq!(cells.len(), 1);
    assert!(mock.requests().iter().all(|r| r.kind == PduKind::GetNext));
}

#[tokio::test]
async fn hinted_values_render_and_parse_symmetrically() {
    let mock = MockTransport::new();
    let mac = if_phys_address_column().child(2);
    mock.queue_response(PduResponse::ok(vec![vb(
        mac.clone(),
        WireValue::OctetString(b"\x00\x1b\x21\x3c\x4d\x5e".as_ref().into()),
    )]));

    let manager = fixture_manager(&mock);
    let column = manager.column("ifPhysAddress").unwrap();
    let index = column.index(vec![2i64.into()]).unwrap();
    let value = column.get(&index).await.unwrap().unwrap();
    assert_eq!(value.as_str(), Some("00:1b:21:3c:4d:5e"));
}

#[tokio::test]
async fn walk_stream_respects_collect_limit() {
    let mock = MockTransport::new();
    let descr = if_descr_column();
    for i in 1..=4u32 {
        mock.queue_response(PduResponse::ok(vec![vb(
            descr.child(i),
            WireValue::Integer(i as i32),
        )]));
    }

    let manager = fixture_manager(&mock);
    let mut walk = manager.session().walk(&descr);
    let results = take_walk_items(&mut walk, 2).await;
    assert_eq!(results.len(), 2);
    // Only the polled pages were requested.
    assert_eq!(mock.request_count(), 2);
}

#[test]
fn unresolved_import_fails_module_load() {
    let module = ModuleBuilder::new("BROKEN-MIB")
        .unresolved_import("SNMPv2-TC")
        .node(SchemaNode::scalar(
            "brokenValue",
            oid!(1, 3, 6, 1, 4, 1, 9999, 1),
            SmiType::Integer32,
        ))
        .build();
    let mut registry = SchemaRegistry::new(MibDump::new().with(module));
    let err = registry.load_module("BROKEN-MIB").unwrap_err();
    match err {
        Error::Schema {
            kind: SchemaErrorKind::Conformance { detail },
            ..
        } => assert!(detail.contains("SNMPv2-TC")),
        other => panic!("expected conformance error, got {other}"),
    }
}
