//! Integration tests for the msgbridge-core wire format.
//!
//! These tests go through the public API only: messages are serialized with
//! `get_message_buffer`, framed the way the session frames them, and decoded
//! again through the registry, exactly as a frame arriving from the server
//! would be.

use msgbridge_core::protocol::framing::{
    encode_frame, unsubscribe_payload, MessageCode, SubscribeResponse, FRAME_HEADER_SIZE,
};
use msgbridge_core::protocol::messages::{
    topics, CommandMessage, DirLocOrientMessage, NewObjectMessage, ObjInfoReqMessage,
    ObjInfoResponseMessage, PropertyMessage, ResponseMessage,
};
use msgbridge_core::protocol::peek_topic;
use msgbridge_core::{
    Buffer, CodecError, Message, MessageFilter, MessageRegistry, Quaternion, Vector,
    RESPONSE_TOPIC,
};

/// Strips the length prefix from a frame, checking it matches the payload.
fn unframe(frame: &[u8]) -> Buffer {
    let (header, payload) = frame.split_at(FRAME_HEADER_SIZE);
    let declared = u32::from_be_bytes([header[0], header[1], header[2], header[3]]);
    assert_eq!(declared as usize, payload.len(), "length prefix must match payload");
    Buffer::from_bytes(payload.to_vec())
}

/// Builds a server-side NEW_OBJECT payload; the client never writes one.
fn new_object_payload(oid: i64, object_type: i32, name: &str) -> Buffer {
    let mut buf = Buffer::new();
    buf.write_byte(MessageCode::ServerMessage as u8);
    buf.write_string(topics::NEW_OBJECT).unwrap();
    buf.write_int64(oid);
    buf.write_int32(object_type);
    buf.write_string(name).unwrap();
    buf.write_vector(&Vector::new(1.0, 2.0, 3.0));
    buf.write_quaternion(&Quaternion::IDENTITY);
    buf
}

#[test]
fn test_int64_survives_two_word_encoding() {
    // Arrange
    let mut buf = Buffer::new();

    // Act
    buf.write_int64(0x1122_3344_5566_7788);

    // Assert
    assert_eq!(
        buf.as_bytes(),
        &[0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88]
    );
    assert_eq!(buf.read_int64().unwrap(), 0x1122_3344_5566_7788);
}

#[test]
fn test_string_peek_then_read() {
    let mut buf = Buffer::new();
    buf.write_string("hello").unwrap();

    assert_eq!(buf.peek_string().unwrap(), "hello");
    assert_eq!(buf.read_offset(), 0);
    assert_eq!(buf.read_string().unwrap(), "hello");
    assert_eq!(buf.read_offset(), 9);
}

#[test]
fn test_framed_new_object_decodes_through_registry() {
    // Arrange
    let registry = MessageRegistry::with_defaults();
    let frame = encode_frame(new_object_payload(1001, 4, "Lamp").as_bytes()).unwrap();

    // Act
    let mut payload = unframe(&frame);
    let msg = registry.decode(&mut payload).unwrap();

    // Assert
    let new_object = msg.downcast::<NewObjectMessage>().unwrap();
    assert_eq!(new_object.oid, 1001);
    assert_eq!(new_object.object_type, 4);
    assert_eq!(new_object.name, "Lamp");
    assert_eq!(new_object.location, Vector::new(1.0, 2.0, 3.0));
    assert_eq!(payload.remaining(), 0, "every byte must be consumed");
}

#[test]
fn test_read_write_schemas_survive_the_registry() {
    let registry = MessageRegistry::with_defaults();

    let moved = DirLocOrientMessage {
        oid: -5,
        direction: Vector::new(0.0, 0.0, 1.0),
        location: Vector::new(10.5, -3.25, 0.0),
        orientation: Quaternion {
            x: 0.0,
            y: 0.707,
            z: 0.0,
            w: 0.707,
        },
    };
    let mut buf = moved.get_message_buffer().unwrap();
    let decoded = registry.decode(&mut buf).unwrap();
    assert_eq!(decoded.downcast_ref::<DirLocOrientMessage>(), Some(&moved));

    let property = PropertyMessage {
        oid: 12,
        key: "colour".to_string(),
        value: "blue".to_string(),
    };
    let mut buf = property.get_message_buffer().unwrap();
    let decoded = registry.decode(&mut buf).unwrap();
    assert_eq!(decoded.downcast_ref::<PropertyMessage>(), Some(&property));
}

#[test]
fn test_write_only_schemas_are_not_decodable() {
    let registry = MessageRegistry::with_defaults();
    let command = CommandMessage {
        oid: 1,
        command: "open".to_string(),
    };
    let mut buf = command.get_message_buffer().unwrap();

    assert!(matches!(
        registry.decode(&mut buf),
        Err(CodecError::UnknownTopic(topic)) if topic == topics::COMMAND
    ));
}

#[test]
fn test_request_and_typed_response() {
    // Arrange – the request as the client sends it
    let request = ObjInfoReqMessage { oid: 42 };
    let mut sent = request.get_message_buffer().unwrap();
    assert_eq!(peek_topic(&mut sent).unwrap(), topics::OBJ_INFO_REQ);

    // The server answers on the shared response topic
    let mut reply = Buffer::new();
    reply.write_byte(MessageCode::ServerMessage as u8);
    reply.write_string(RESPONSE_TOPIC).unwrap();
    reply.write_int64(42);
    reply.write_int32(2);
    reply.write_string("Door").unwrap();
    reply.write_vector(&Vector::ZERO);

    // Act
    let registry = MessageRegistry::with_defaults();
    let response = registry
        .decode_response(Some(request.topic()), &mut reply)
        .unwrap();

    // Assert
    let info = response.downcast_ref::<ObjInfoResponseMessage>().unwrap();
    assert_eq!(info.oid, 42);
    assert!(MessageFilter::response().matches(response.as_ref()));
}

#[test]
fn test_untyped_response_keeps_raw_body() {
    let mut reply = Buffer::new();
    reply.write_byte(MessageCode::ServerMessage as u8);
    reply.write_string(RESPONSE_TOPIC).unwrap();
    reply.write_bytes(&[1, 2, 3]);

    let response = MessageRegistry::with_defaults()
        .decode_response(None, &mut reply)
        .unwrap();

    assert_eq!(
        response.downcast_ref::<ResponseMessage>().map(|r| r.body.clone()),
        Some(vec![1, 2, 3])
    );
}

#[test]
fn test_subscribe_frame_layout() {
    // Arrange – SUBSCRIBE = code + id + filter
    let mut payload = Buffer::new();
    payload.write_byte(MessageCode::Subscribe as u8);
    payload.write_int32(7);
    MessageFilter::oid(topics::PROPERTY, 3)
        .write(&mut payload)
        .unwrap();

    // Act – read it back the way the server would
    let mut received = unframe(&encode_frame(payload.as_bytes()).unwrap());
    let code = MessageCode::try_from(received.read_byte().unwrap()).unwrap();
    let sub_id = received.read_int32().unwrap();
    let filter = MessageFilter::read(&mut received).unwrap();

    // Assert
    assert_eq!(code, MessageCode::Subscribe);
    assert_eq!(sub_id, 7);
    assert_eq!(filter, MessageFilter::oid(topics::PROPERTY, 3));
}

#[test]
fn test_control_payloads() {
    let mut ack = SubscribeResponse {
        sub_id: 9,
        success: true,
    }
    .to_payload();
    assert_eq!(ack.read_byte().unwrap(), MessageCode::SubscribeResponse as u8);
    assert_eq!(
        SubscribeResponse::read(&mut ack).unwrap(),
        SubscribeResponse {
            sub_id: 9,
            success: true
        }
    );

    let unsubscribe = unsubscribe_payload(9);
    assert_eq!(unsubscribe.as_bytes(), &[1, 0, 0, 0, 9]);
}

#[test]
fn test_truncated_frame_is_an_underrun_not_a_panic() {
    let full = new_object_payload(1, 1, "Rock");
    let mut truncated = Buffer::from_bytes(full.as_bytes()[..full.len() - 3].to_vec());

    let result = MessageRegistry::with_defaults().decode(&mut truncated);

    assert!(matches!(result, Err(CodecError::BufferUnderrun { .. })));
}
