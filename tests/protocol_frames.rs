use nodetrack::error::ProtocolError;
use nodetrack::network::message::{
    split_frame, AgentRequest, NodeAddress, ResultBody, ResultStatus, TrackerRequest,
};

#[test]
fn split_uses_first_delimiter_only() {
    let frame = split_frame(r#"chat:{"message":"a:b:c","from":"127.0.0.1:9001"}"#).unwrap();
    assert_eq!(frame.tag, "chat");
    assert_eq!(
        frame.payload,
        Some(r#"{"message":"a:b:c","from":"127.0.0.1:9001"}"#)
    );
}

#[test]
fn bare_tag_has_no_payload() {
    let frame = split_frame("get_ip").unwrap();
    assert_eq!(frame.tag, "get_ip");
    assert_eq!(frame.payload, None);

    let frame = split_frame("get_list:").unwrap();
    assert_eq!(frame.tag, "get_list");
    assert_eq!(frame.payload, None);
}

#[test]
fn empty_line_is_rejected() {
    assert!(matches!(split_frame("   "), Err(ProtocolError::Empty)));
}

#[test]
fn chat_payload_may_contain_delimiter() {
    let line = r#"chat_message:{"token":"t","message":"time is 12:30","from":"127.0.0.1:9001"}"#;
    match AgentRequest::parse(line).unwrap() {
        AgentRequest::Chat(body) => {
            assert_eq!(body.message, "time is 12:30");
            assert_eq!(body.sender_str(), Some("127.0.0.1:9001"));
            assert_eq!(body.token_str(), Some("t"));
        }
        other => panic!("unexpected request {:?}", other),
    }
}

#[test]
fn peer_connect_address_is_a_json_pair() {
    let req = AgentRequest::parse(r#"peer_connect:{"address":["127.0.0.1",9001]}"#).unwrap();
    match &req {
        AgentRequest::PeerConnect(body) => {
            assert_eq!(body.address, NodeAddress::new("127.0.0.1", 9001));
        }
        other => panic!("unexpected request {:?}", other),
    }
    assert_eq!(
        req.to_line(),
        r#"peer_connect:{"address":["127.0.0.1",9001]}"#
    );
}

#[test]
fn missing_field_is_invalid_payload() {
    let err = AgentRequest::parse(r#"chat:{"token":"t","from":"a:1"}"#).unwrap_err();
    assert!(matches!(err, ProtocolError::InvalidPayload { tag: "chat", .. }));

    let err = AgentRequest::parse("peer_connect").unwrap_err();
    assert!(matches!(err, ProtocolError::MissingPayload("peer_connect")));
}

#[test]
fn unknown_tag_is_reported() {
    let err = AgentRequest::parse("dance:{}").unwrap_err();
    assert!(matches!(err, ProtocolError::UnknownTag(ref t) if t == "dance"));
}

#[test]
fn tracker_requests_parse() {
    assert_eq!(TrackerRequest::parse("get_list").unwrap(), TrackerRequest::GetList);
    assert_eq!(
        TrackerRequest::parse(r#"get_list:{"anything":true}"#).unwrap(),
        TrackerRequest::GetList
    );
    assert_eq!(TrackerRequest::parse("get_ip").unwrap(), TrackerRequest::GetIp);
    match TrackerRequest::parse(r#"submit_info:{"address":["10.0.0.2",7092]}"#).unwrap() {
        TrackerRequest::SubmitInfo(body) => assert_eq!(body.address.to_string(), "10.0.0.2:7092"),
        other => panic!("unexpected request {:?}", other),
    }
    assert_eq!(TrackerRequest::GetList.to_line(), "get_list:{}");
}

#[test]
fn result_lines_have_expected_shape() {
    assert_eq!(
        ResultBody::token("abc").to_line(),
        r#"result:{"status":"OK","token":"abc"}"#
    );
    assert_eq!(
        ResultBody::unauthorized().to_line(),
        r#"result:{"status":"ERROR","message":"Unauthorized"}"#
    );
    let parsed = ResultBody::parse_line(r#"result:{"status":"OK","message":"Message received"}"#).unwrap();
    assert_eq!(parsed.status, ResultStatus::Ok);
    assert_eq!(parsed.message.as_deref(), Some("Message received"));
    assert!(ResultBody::parse_line(r#"{"status":"OK"}"#).is_err());
}

#[test]
fn node_address_forms() {
    let expected = NodeAddress::new("127.0.0.1", 9001);
    assert_eq!(NodeAddress::parse_flexible("127.0.0.1:9001").unwrap(), expected);
    assert_eq!(NodeAddress::parse_flexible(r#""127.0.0.1:9001""#).unwrap(), expected);
    assert_eq!(NodeAddress::parse_flexible(r#"["127.0.0.1", 9001]"#).unwrap(), expected);
    assert!(NodeAddress::parse_flexible("no-port").is_err());
    assert!(NodeAddress::parse_flexible("host:99999").is_err());

    let v6: NodeAddress = "[::1]:7090".parse().unwrap();
    assert_eq!(v6.host, "::1");
    assert_eq!(v6.to_string(), "[::1]:7090");
}
