//! Integration tests for sungrow-modbus.

use sungrow_modbus::testing::{MockTransport, encode_string};
use sungrow_modbus::{
    Model, ModelRegistry, PollCycle, PollError, PollState, RegisterPlanner, RegisterSpace,
    SnapshotStore, TransportError, Value, plan, sensors_for,
};

fn sh25t_device() -> MockTransport {
    let mut transport = MockTransport::with_identity(0x0E26);
    transport
        .set_input(4989, &encode_string("B2209876543", 10))
        .set_input(4999, &[0x0E26])
        .set_input(5007, &[0xFFEC]) // -2.0 °C
        .set_input(5010, &[6020, 85, 6011, 84, 5988, 80])
        .set_input(5016, &[0x0001, 0x2C80]); // 76 928 W
    transport
}

/// Every built-in register map must plan cleanly.
#[test]
fn test_builtin_models_plan() {
    for model in Model::ALL {
        let blocks = plan(&model.registers()).expect("Built-in model failed to plan");
        assert!(!blocks.is_empty(), "{} produced no blocks", model);
    }
}

#[test]
fn test_sh25t_block_layout() {
    let blocks = plan(&Model::Sh25T.registers()).unwrap();
    let layout: Vec<_> = blocks
        .iter()
        .map(|b| (b.start_address(), b.total_word_count()))
        .collect();

    assert_eq!(layout, vec![(4989, 11), (5007, 1), (5010, 8)]);
}

#[tokio::test]
async fn test_sh25t_poll_cycle() {
    let registry = ModelRegistry::builtin().unwrap();
    let mut transport = sh25t_device();

    let snapshot = PollCycle::new(&registry, 1)
        .run(&mut transport)
        .await
        .expect("Poll cycle failed");

    assert_eq!(snapshot.model(), Model::Sh25T);
    assert_eq!(snapshot.len(), 10);
    assert_eq!(snapshot.get(5016), Some(&Value::Integer(76_928)));
    assert_eq!(
        snapshot.get(4989).and_then(Value::as_str),
        Some("B2209876543")
    );

    let temperature = snapshot.get(5007).and_then(Value::as_f64).unwrap();
    assert!((temperature - -2.0).abs() < 1e-9);

    let mppt3_voltage = snapshot.get(5014).and_then(Value::as_f64).unwrap();
    assert!((mppt3_voltage - 598.8).abs() < 1e-9);
}

#[tokio::test]
async fn test_partial_snapshot_published() {
    let registry = ModelRegistry::builtin().unwrap();
    let store = SnapshotStore::new();
    let mut transport = sh25t_device();
    transport.fail_read(
        RegisterSpace::Input,
        5010,
        TransportError::Exception("GatewayTargetDevice".into()),
    );

    let snapshot = PollCycle::new(&registry, 1).run(&mut transport).await.unwrap();
    store.publish(snapshot);

    let definition = registry.get(0x0E26).unwrap();
    let sensors = sensors_for(definition, "Garage", 1);
    let known: Vec<_> = sensors
        .iter()
        .filter(|s| store.value(s).is_some())
        .map(|s| s.address())
        .collect();

    assert_eq!(known, vec![4989, 4999, 5007]);
    assert_eq!(store.latest().unwrap().failed_blocks().len(), 1);
}

#[tokio::test]
async fn test_unsupported_model_not_published() {
    let registry = ModelRegistry::builtin().unwrap();
    let store = SnapshotStore::new();
    let mut transport = MockTransport::with_identity(0xFFFF);
    let mut cycle = PollCycle::new(&registry, 1);

    match cycle.run(&mut transport).await {
        Ok(snapshot) => {
            store.publish(snapshot);
        }
        Err(e) => store.record_failure(e),
    }

    assert_eq!(cycle.state(), PollState::Failed);
    assert!(store.latest().is_none());
    assert_eq!(store.last_error(), Some(PollError::UnsupportedModel(0xFFFF)));
}

#[tokio::test]
async fn test_small_block_limit_issues_more_reads() {
    let registry = ModelRegistry::builtin().unwrap();
    let mut transport = sh25t_device();
    let planner = RegisterPlanner::with_max_block_words(4).unwrap();

    let snapshot = PollCycle::new(&registry, 1)
        .with_planner(planner)
        .run(&mut transport)
        .await
        .unwrap();

    assert!(snapshot.is_complete());
    assert_eq!(snapshot.len(), 10);
    assert!(
        transport
            .requests()
            .iter()
            .all(|r| r.count <= 4 || r.start == 4989)
    );
}

#[test]
fn test_snapshot_serializes_by_address() {
    let registry = ModelRegistry::builtin().unwrap();
    let mut transport = sh25t_device();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();

    let snapshot = runtime
        .block_on(PollCycle::new(&registry, 1).run(&mut transport))
        .unwrap();
    let json = serde_json::to_value(&snapshot).unwrap();

    assert_eq!(json["identity_code"], 0x0E26);
    assert_eq!(json["model"], "sh25t");
    assert_eq!(json["values"]["5016"], 76_928);
}
