//! Codec Tests
//!
//! Tests for request and response encoding/decoding.

use std::io::Cursor;
use kvstore::protocol::{
    Request, Response, Status,
    encode_request, decode_request,
    encode_response, decode_response,
    read_request, write_request,
    read_response, write_response,
};

// =============================================================================
// Request Encoding/Decoding Tests
// =============================================================================

#[test]
fn test_encode_decode_set() {
    let req = Request::Set {
        key: b"mykey".to_vec(),
        value: b"myvalue".to_vec(),
    };
    let encoded = encode_request(&req);
    assert_eq!(decode_request(&encoded).unwrap(), req);
}

#[test]
fn test_encode_decode_get() {
    let req = Request::Get {
        key: b"hello".to_vec(),
    };
    let encoded = encode_request(&req);
    assert_eq!(decode_request(&encoded).unwrap(), req);
}

#[test]
fn test_encode_decode_delete() {
    let req = Request::Delete {
        key: b"todelete".to_vec(),
    };
    let encoded = encode_request(&req);
    assert_eq!(decode_request(&encoded).unwrap(), req);
}

#[test]
fn test_encode_decode_ping() {
    let encoded = encode_request(&Request::Ping);
    assert_eq!(decode_request(&encoded).unwrap(), Request::Ping);
}

#[test]
fn test_encode_decode_empty_key_and_value() {
    let req = Request::Set {
        key: vec![],
        value: vec![],
    };
    let encoded = encode_request(&req);
    assert_eq!(decode_request(&encoded).unwrap(), req);
}

#[test]
fn test_encode_decode_binary_data() {
    // Null bytes and high bytes pass through untouched
    let binary_key: Vec<u8> = vec![0x00, 0x01, 0xFF, 0xFE, 0x80];
    let binary_value: Vec<u8> = (0..=255).collect();

    let req = Request::Set {
        key: binary_key,
        value: binary_value,
    };
    let encoded = encode_request(&req);
    assert_eq!(decode_request(&encoded).unwrap(), req);
}

#[test]
fn test_decode_ignores_bytes_after_frame() {
    let mut encoded = encode_request(&Request::Get { key: b"k".to_vec() });
    encoded.extend_from_slice(&encode_request(&Request::Ping));

    let decoded = decode_request(&encoded).unwrap();
    assert_eq!(decoded, Request::Get { key: b"k".to_vec() });
}

#[test]
fn test_ping_key_bytes_are_ignored() {
    // [len=8][op=PING][key_len=3][abc]
    let bytes = [0, 0, 0, 8, 0x04, 0, 0, 0, 3, b'a', b'b', b'c'];
    assert_eq!(decode_request(&bytes).unwrap(), Request::Ping);
}

#[test]
fn test_request_classification() {
    let set = Request::Set {
        key: b"k".to_vec(),
        value: b"v".to_vec(),
    };
    assert!(set.is_mutation());
    assert!(Request::Delete { key: b"k".to_vec() }.is_mutation());
    assert!(!Request::Get { key: b"k".to_vec() }.is_mutation());
    assert!(!Request::Ping.is_mutation());
    assert!(Request::Ping.key().is_empty());
}

// =============================================================================
// Response Encoding/Decoding Tests
// =============================================================================

#[test]
fn test_encode_decode_response_ok() {
    let resp = Response::ok(b"value".to_vec());
    let encoded = encode_response(&resp);
    let decoded = decode_response(&encoded).unwrap();

    assert_eq!(decoded.status, Status::Ok);
    assert_eq!(decoded.payload, b"value".to_vec());
}

#[test]
fn test_encode_decode_response_ok_empty_payload() {
    let resp = Response::ok(Vec::new());
    let decoded = decode_response(&encode_response(&resp)).unwrap();

    assert_eq!(decoded.status, Status::Ok);
    assert!(decoded.payload.is_empty());
}

#[test]
fn test_encode_decode_response_not_found() {
    let resp = Response::not_found();
    let decoded = decode_response(&encode_response(&resp)).unwrap();

    assert_eq!(decoded.status, Status::NotFound);
    assert_eq!(decoded.payload, b"Key not found".to_vec());
}

#[test]
fn test_encode_decode_response_error() {
    let resp = Response::error("something went wrong");
    let decoded = decode_response(&encode_response(&resp)).unwrap();

    assert_eq!(decoded, resp);
}

// =============================================================================
// Error Handling Tests
// =============================================================================

#[test]
fn test_incomplete_header() {
    let bytes = [0x00, 0x00, 0x00, 0x05, 0x02]; // key length missing
    let result = decode_request(&bytes);
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("Incomplete header"));
}

#[test]
fn test_declared_length_exceeds_buffer() {
    // Frame says 20 bytes follow, only 9 do
    let bytes = [0, 0, 0, 20, 0x02, 0, 0, 0, 4, b't', b'e', b's', b't'];
    let result = decode_request(&bytes);
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("Incomplete frame"));
}

#[test]
fn test_key_length_overruns_frame() {
    // GET with key_len 10 but only 2 key bytes inside the frame
    let bytes = [0, 0, 0, 7, 0x02, 0, 0, 0, 10, b'a', b'b'];
    let result = decode_request(&bytes);
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("overruns"));
}

#[test]
fn test_set_without_value_is_rejected() {
    // SET frame that stops after the key
    let bytes = [0, 0, 0, 6, 0x01, 0, 0, 0, 1, b'k'];
    let result = decode_request(&bytes);
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("missing value"));
}

#[test]
fn test_trailing_bytes_in_get_are_ignored() {
    // GET frame with an unexpected value section
    let bytes = [0, 0, 0, 11, 0x02, 0, 0, 0, 1, b'k', 0, 0, 0, 1, b'v'];
    let decoded = decode_request(&bytes).unwrap();
    assert_eq!(decoded, Request::Get { key: b"k".to_vec() });
}

#[test]
fn test_trailing_bytes_in_delete_are_ignored() {
    let bytes = [0, 0, 0, 11, 0x03, 0, 0, 0, 1, b'k', 0, 0, 0, 1, b'v'];
    let decoded = decode_request(&bytes).unwrap();
    assert_eq!(decoded, Request::Delete { key: b"k".to_vec() });
}

#[test]
fn test_unknown_opcode() {
    let bytes = [0, 0, 0, 5, 0xFF, 0, 0, 0, 0];
    let result = decode_request(&bytes);
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("Unknown opcode"));
}

#[test]
fn test_zero_length_frame() {
    let bytes = [0, 0, 0, 0, 0, 0, 0, 0, 0];
    let result = decode_request(&bytes);
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("too short"));
}

#[test]
fn test_unknown_response_status() {
    let bytes = [0xFF, 0x00, 0x00, 0x00, 0x00];
    let result = decode_response(&bytes);
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("Unknown response status"));
}

#[test]
fn test_response_payload_overruns_buffer() {
    let bytes = [0x00, 0x00, 0x00, 0x00, 0x05, b'h', b'i'];
    assert!(decode_response(&bytes).is_err());
}

// =============================================================================
// Stream I/O Tests
// =============================================================================

#[test]
fn test_stream_write_read_request() {
    let req = Request::Set {
        key: b"key".to_vec(),
        value: b"value".to_vec(),
    };

    let mut buffer = Vec::new();
    write_request(&mut buffer, &req).unwrap();

    let mut cursor = Cursor::new(buffer);
    assert_eq!(read_request(&mut cursor).unwrap(), req);
}

#[test]
fn test_stream_multiple_requests() {
    let requests = vec![
        Request::Ping,
        Request::Set {
            key: b"k1".to_vec(),
            value: b"v1".to_vec(),
        },
        Request::Get { key: b"k1".to_vec() },
        Request::Delete { key: b"k1".to_vec() },
    ];

    let mut buffer = Vec::new();
    for req in &requests {
        write_request(&mut buffer, req).unwrap();
    }

    let mut cursor = Cursor::new(buffer);
    for expected in &requests {
        assert_eq!(&read_request(&mut cursor).unwrap(), expected);
    }
}

#[test]
fn test_stream_multiple_responses() {
    let responses = vec![
        Response::ok(b"data".to_vec()),
        Response::not_found(),
        Response::error("oops"),
        Response::ok(Vec::new()),
    ];

    let mut buffer = Vec::new();
    for resp in &responses {
        write_response(&mut buffer, resp).unwrap();
    }

    // Each read consumes exactly one response, even back to back
    let mut cursor = Cursor::new(buffer);
    for expected in &responses {
        assert_eq!(&read_response(&mut cursor).unwrap(), expected);
    }
}

#[test]
fn test_stream_truncated_response_is_error() {
    let mut buffer = encode_response(&Response::ok(b"abcdef".to_vec()));
    buffer.truncate(8);

    let mut cursor = Cursor::new(buffer);
    assert!(read_response(&mut cursor).is_err());
}

// =============================================================================
// Wire Format Verification Tests
// =============================================================================

#[test]
fn test_wire_format_get() {
    let encoded = encode_request(&Request::Get {
        key: b"test".to_vec(),
    });

    // Expected: [0x00 0x00 0x00 0x09][0x02][0x00 0x00 0x00 0x04][t e s t]
    //           frame_len(9)         op    key_len(4)          key
    assert_eq!(&encoded[0..4], &[0x00, 0x00, 0x00, 0x09]);
    assert_eq!(encoded[4], 0x02); // GET
    assert_eq!(&encoded[5..9], &[0x00, 0x00, 0x00, 0x04]);
    assert_eq!(&encoded[9..13], b"test");
    assert_eq!(encoded.len(), 13);
}

#[test]
fn test_wire_format_set() {
    let encoded = encode_request(&Request::Set {
        key: b"foo".to_vec(),
        value: b"bar".to_vec(),
    });

    let expected: Vec<u8> = vec![
        0, 0, 0, 15, // frame_len
        0x01, // SET
        0, 0, 0, 3, b'f', b'o', b'o',
        0, 0, 0, 3, b'b', b'a', b'r',
    ];
    assert_eq!(encoded, expected);
}

#[test]
fn test_wire_format_ping() {
    let encoded = encode_request(&Request::Ping);
    assert_eq!(encoded, vec![0, 0, 0, 5, 0x04, 0, 0, 0, 0]);
}

#[test]
fn test_wire_format_response_codes() {
    assert_eq!(encode_response(&Response::ok(b"hi".to_vec())), vec![0x00, 0, 0, 0, 2, b'h', b'i']);
    assert_eq!(encode_response(&Response::error("x"))[0], 0x01);
    assert_eq!(encode_response(&Response::not_found())[0], 0x02);
}
