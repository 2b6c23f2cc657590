//! Round trips of every catalogue message through the JSON protocol.

use std::any::TypeId;

use cavern_protocol::catalogue::{
    self, Actor, ActorKind, ActorRequest, ActorResponse, Condition, DataRequest, DataResponse,
    EndTurn, Introduction, IntroductionRequest, Object, PrepareTurnRequest, Sensation, Senses,
    Tile, TurnRequest, TurnResult,
};
use cavern_protocol::{Message, MessageId, Model, Protocol, ProtocolError, ValidationError};
use serde_json::json;

fn protocol() -> Protocol {
    catalogue::protocol().unwrap()
}

fn actor() -> Actor {
    Actor {
        kind: "caveman".into(),
        x: 1,
        y: 2,
        senses: Senses {
            sight: vec![Sensation {
                traits: vec!["fruit_green".into(), "edible".into()],
                x: 2,
                y: 2,
            }],
            hearing: vec![],
            smell: vec![Sensation {
                traits: vec!["fruit_green".into()],
                x: 2,
                y: 2,
            }],
        },
        condition: Condition {
            hunger: 1.5,
            thirst: 0.25,
            temperature: -3.0,
            health: 99.0,
        },
    }
}

fn world() -> DataResponse {
    let tile = |object: Option<&str>| Tile {
        kind: 0,
        z: 0.5,
        object: object.map(|repr| Object { repr: repr.into() }),
    };
    DataResponse {
        width: 2,
        height: 2,
        tiles: vec![
            vec![tile(None), tile(Some("stone"))],
            vec![tile(Some("caveman")), tile(None)],
        ],
    }
}

fn round_trip<M: Message + PartialEq>(protocol: &Protocol, message: M) {
    let bytes = protocol.encode(&message).unwrap();
    let decoded = protocol.decode(&bytes).unwrap();
    assert_eq!(decoded.downcast_ref::<M>(), Some(&message));
}

#[test]
fn test_every_catalogue_message_round_trips() {
    let protocol = protocol();
    round_trip(&protocol, ActorRequest { kind: ActorKind::Caveman });
    round_trip(
        &protocol,
        ActorResponse {
            success: true,
            actor: actor(),
        },
    );
    round_trip(&protocol, PrepareTurnRequest { actor: actor() });
    round_trip(&protocol, TurnRequest {});
    round_trip(&protocol, TurnResult::accepted());
    round_trip(&protocol, TurnResult::rejected("not your turn"));
    round_trip(&protocol, IntroductionRequest {});
    round_trip(&protocol, Introduction { name: "grok".into() });
    round_trip(&protocol, world());
    round_trip(&protocol, DataRequest {});
    round_trip(&protocol, EndTurn {});
}

#[test]
fn test_registry_is_a_bijection() {
    let protocol = protocol();
    let registry = protocol.registry();
    assert_eq!(registry.len(), 10);

    let ids = [
        registry.id_of::<ActorRequest>().unwrap(),
        registry.id_of::<ActorResponse>().unwrap(),
        registry.id_of::<PrepareTurnRequest>().unwrap(),
        registry.id_of::<TurnRequest>().unwrap(),
        registry.id_of::<TurnResult>().unwrap(),
        registry.id_of::<IntroductionRequest>().unwrap(),
        registry.id_of::<Introduction>().unwrap(),
        registry.id_of::<DataResponse>().unwrap(),
        registry.id_of::<DataRequest>().unwrap(),
        registry.id_of::<EndTurn>().unwrap(),
    ];
    for (expected, id) in ids.iter().enumerate() {
        assert_eq!(*id, MessageId(expected as u32));
    }
    assert_eq!(
        registry.type_of(MessageId(6)),
        Some(TypeId::of::<Introduction>())
    );
    assert_eq!(registry.type_of(MessageId(10)), None);
}

#[test]
fn test_envelope_wire_shape() {
    let bytes = protocol()
        .encode(&TurnResult::rejected("not your turn"))
        .unwrap();
    assert_eq!(
        String::from_utf8(bytes).unwrap(),
        r#"{"id":4,"payload":{"success":false,"error":"not your turn"}}"#
    );
}

#[test]
fn test_missing_field_is_reported() {
    let frame = json!({"id": 6, "payload": {}}).to_string();
    let err = protocol().decode(frame.as_bytes()).unwrap_err();
    match err {
        ProtocolError::Validation(ValidationError::MissingField { schema, field }) => {
            assert_eq!((schema, field), ("Introduction", "name"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_wrong_type_is_reported() {
    let frame = json!({"id": 1, "payload": {"success": "yes", "actor": {}}}).to_string();
    let err = protocol().decode(frame.as_bytes()).unwrap_err();
    assert!(matches!(
        err,
        ProtocolError::Validation(ValidationError::TypeMismatch { actual: "str", .. })
    ));
}

#[test]
fn test_unknown_id_is_reported() {
    let frame = json!({"id": 42, "payload": {}}).to_string();
    let err = protocol().decode(frame.as_bytes()).unwrap_err();
    assert!(matches!(err, ProtocolError::UnknownMessageId(MessageId(42))));
}

#[test]
fn test_serialized_values_satisfy_their_own_schema() {
    let value = actor().to_value().unwrap();
    assert_eq!(Actor::schema().validate(&value).unwrap(), value);

    let value = world().to_value().unwrap();
    assert_eq!(DataResponse::schema().validate(&value).unwrap(), value);
}
