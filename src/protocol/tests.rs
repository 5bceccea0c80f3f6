// test-only module included via protocol/mod.rs
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use crate::core::response::Response;
use crate::error::ProtocolError;
use crate::protocol::auth::{AuthState, Authenticator};
use crate::protocol::consts::{CryptMethod, Param};
use crate::protocol::retcode::RetCode;
use crate::utils::crypto::hash_password;

const PASSWORD: &str = "Manager1";
const SRV_RAND: &str = "aabbccddeeff00112233445566778899";

fn start_answer() -> Response {
    Response::parse(&format!("AUTH_START|RETCODE=0 Done|SRV_RAND={SRV_RAND}|\r\n"))
}

#[test]
fn test_handshake_flow() {
    let mut auth = Authenticator::new("100", PASSWORD);
    assert_eq!(auth.state(), AuthState::Idle);

    // =================== Step 1: AUTH_START ===================
    let start = auth.start_request().unwrap();
    assert_eq!(start.get(Param::Version), Some("1881"));
    assert_eq!(start.get(Param::Agent), Some("WebAPI"));
    assert_eq!(start.get(Param::Login), Some("100"));
    assert_eq!(start.get(Param::Type), Some("MANAGER"));
    assert_eq!(start.get(Param::CryptMethod), Some("NONE"));
    assert_eq!(auth.state(), AuthState::AwaitingStartAnswer);

    // =================== Step 2: AUTH_ANSWER ===================
    let reply = auth.on_start_answer(&start_answer()).unwrap();
    assert_eq!(
        reply.get(Param::SrvRandAnswer).unwrap(),
        hash_password(PASSWORD, SRV_RAND).unwrap()
    );
    let cli_rand = reply.get(Param::CliRand).unwrap().to_string();
    assert_eq!(cli_rand.len(), 32);
    assert_eq!(auth.state(), AuthState::AwaitingAnswerAck);

    // =================== Step 3: server proof ===================
    let proof = hash_password(PASSWORD, &cli_rand).unwrap();
    let ack = Response::parse(&format!(
        "AUTH_ANSWER|RETCODE=0 Done|CLI_RAND_ANSWER={proof}|CRYPT_RAND={}|\r\n",
        "0f".repeat(256)
    ));
    let outcome = auth.on_answer_ack(&ack).unwrap();
    assert_eq!(auth.state(), AuthState::Authenticated);
    assert_eq!(outcome.crypt_rand.as_deref().map(str::len), Some(512));
}

#[test]
fn test_start_answer_retcode_fails() {
    let mut auth = Authenticator::new("100", PASSWORD);
    auth.start_request().unwrap();

    let answer = Response::parse("AUTH_START|RETCODE=3 Invalid parameters|\r\n");
    let err = auth.on_start_answer(&answer).unwrap_err();
    assert!(matches!(err, ProtocolError::RetCode(RetCode::ErrParams)));
    assert_eq!(auth.state(), AuthState::Failed);
}

#[test]
fn test_start_answer_placeholder_rand_fails() {
    let mut auth = Authenticator::new("100", PASSWORD);
    auth.start_request().unwrap();

    let answer = Response::parse("AUTH_START|RETCODE=0 Done|SRV_RAND=none|\r\n");
    assert!(matches!(
        auth.on_start_answer(&answer),
        Err(ProtocolError::MissingField("SRV_RAND"))
    ));
    assert_eq!(auth.state(), AuthState::Failed);
}

#[test]
fn test_wrong_answer_command_fails() {
    let mut auth = Authenticator::new("100", PASSWORD);
    auth.start_request().unwrap();

    let answer = Response::parse(&format!("AUTH_ANSWER|RETCODE=0|SRV_RAND={SRV_RAND}|"));
    assert!(matches!(
        auth.on_start_answer(&answer),
        Err(ProtocolError::UnexpectedCommand { .. })
    ));
}

#[test]
fn test_server_hash_mismatch() {
    let mut auth = Authenticator::new("100", PASSWORD);
    auth.start_request().unwrap();
    let reply = auth.on_start_answer(&start_answer()).unwrap();

    // server hashed with a different password
    let proof = hash_password("other", reply.get(Param::CliRand).unwrap()).unwrap();
    let ack = Response::parse(&format!("AUTH_ANSWER|RETCODE=0|CLI_RAND_ANSWER={proof}|"));
    let err = auth.on_answer_ack(&ack).unwrap_err();

    assert!(matches!(err, ProtocolError::ServerNotAuthenticated));
    assert_eq!(err.retcode(), RetCode::AuthServerBad);
    assert_eq!(auth.state(), AuthState::Failed);
}

#[test]
fn test_bad_credentials_are_a_return_code() {
    let mut auth = Authenticator::new("100", PASSWORD);
    auth.start_request().unwrap();
    auth.on_start_answer(&start_answer()).unwrap();

    let ack = Response::parse("AUTH_ANSWER|RETCODE=3006 Invalid account password|");
    assert!(matches!(
        auth.on_answer_ack(&ack),
        Err(ProtocolError::RetCode(RetCode::UsrInvalidPassword))
    ));
}

#[test]
fn test_steps_out_of_order_fail() {
    let mut auth = Authenticator::new("100", PASSWORD);
    assert!(auth.on_start_answer(&start_answer()).is_err());
    assert_eq!(auth.state(), AuthState::Failed);
    // a failed handshake cannot be restarted
    assert!(auth.start_request().is_err());
}

#[test]
fn test_empty_credentials_rejected() {
    let mut auth = Authenticator::new("", PASSWORD);
    assert!(matches!(
        auth.start_request(),
        Err(ProtocolError::MissingField("LOGIN"))
    ));
}

#[test]
fn test_crypt_method_and_agent() {
    let mut auth = Authenticator::new("100", PASSWORD)
        .with_agent("Backoffice")
        .with_crypt_method(CryptMethod::Aes256Ofb);
    let start = auth.start_request().unwrap();
    assert_eq!(start.get(Param::CryptMethod), Some("AES256OFB"));
    assert_eq!(start.get(Param::Agent), Some("Backoffice"));
}
