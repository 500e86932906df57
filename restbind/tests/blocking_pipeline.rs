//! End-to-end pipeline tests through a blocking client and a counting
//! in-memory transport.

mod common;

use std::sync::{Arc, Mutex};

use common::{blocking, config, MockTransport};
use restbind::resolve::resolve;
use restbind::{
    ApiError, BlockingClient, CallArgs, DataResponse, Endpoint, EndpointOverrides, JsonFormat, Next,
    ResourceConfig, ResourceDef, ValidatorError, ValidatorMode,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct User {
    id: u64,
    name: String,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CreateUser {
    name: String,
    email: String,
}

fn get_user() -> Endpoint<JsonFormat<User>> {
    Endpoint::get("get_user", "/{id}").build().unwrap()
}

fn users_client(def: &ResourceDef, mock: &Arc<MockTransport>) -> BlockingClient {
    BlockingClient::builder(config())
        .resource(def)
        .transport(blocking(mock))
        .build()
        .unwrap()
}

#[test]
fn client_only_configuration_resolves_to_itself() {
    let client = config()
        .with_header("Accept", "application/json")
        .with_cookie("session", "s1");
    let effective = resolve(&client, Some(&ResourceConfig::default()), &EndpointOverrides::default());

    assert_eq!(effective.base_url, client.base_url);
    assert_eq!(effective.timeout, client.timeout);
    assert_eq!(effective.headers, client.headers);
    assert_eq!(effective.cookies, client.cookies);
    assert_eq!(effective.follow_redirects, client.follow_redirects);
    assert_eq!(effective.raise_on_error, client.raise_on_error);
}

#[test]
fn get_user_returns_typed_data() {
    let ep = get_user();
    let users = ResourceDef::builder("users", ResourceConfig::new("/users"))
        .endpoint(&ep)
        .build()
        .unwrap();
    let mock = Arc::new(MockTransport::json(
        200,
        json!({"id": 1, "name": "Ann", "email": "a@x.com"}),
    ));
    let client = users_client(&users, &mock);

    let response = client
        .resource(&users)
        .unwrap()
        .bind(&ep)
        .unwrap()
        .call(CallArgs::new().arg("id", 1))
        .unwrap();

    assert_eq!(response.status_code, 200);
    assert_eq!(response.data.name, "Ann");
    assert_eq!(response.data.email.as_deref(), Some("a@x.com"));
    assert_eq!(mock.calls(), 1);
    assert_eq!(mock.last_request().url.as_str(), "https://api.example.com/users/1");
}

#[test]
fn path_values_are_percent_encoded() {
    let ep: Endpoint<JsonFormat<Value>> = Endpoint::get("get_file", "/files/{dir}/{name}").build().unwrap();
    let client = BlockingClient::builder(config())
        .endpoint(&ep)
        .transport(blocking(&Arc::new(MockTransport::json(200, json!({})))))
        .build()
        .unwrap();

    let response = client
        .bind(&ep)
        .unwrap()
        .call(CallArgs::new().arg("dir", "a b/c").arg("name", "x{y}.txt"))
        .unwrap();

    assert_eq!(response.url.path(), "/files/a%20b%2Fc/x%7By%7D.txt");
    assert!(!response.url.as_str().contains('{'));
    assert!(!response.url.as_str().contains('}'));
}

#[test]
fn missing_path_parameter_never_reaches_transport() {
    let ep: Endpoint<JsonFormat<Value>> = Endpoint::get("get_post", "/users/{user_id}/posts/{post_id}")
        .build()
        .unwrap();
    let mock = Arc::new(MockTransport::json(200, json!({})));
    let client = BlockingClient::builder(config())
        .endpoint(&ep)
        .transport(blocking(&mock))
        .build()
        .unwrap();
    let bound = client.bind(&ep).unwrap();

    let err = bound.call(CallArgs::new().arg("user_id", 1)).unwrap_err();
    assert!(matches!(err, ApiError::MissingParameter { ref names, .. } if names == &["post_id"]));

    let err = bound.call(CallArgs::new()).unwrap_err();
    assert!(matches!(err, ApiError::MissingParameter { ref names, .. } if names.len() == 2));
    assert!(err.is_pre_send());
    assert_eq!(mock.calls(), 0);
}

#[test]
fn before_validators_run_in_order_and_abort_on_error() {
    let ep = get_user();
    let log = Arc::new(Mutex::new(Vec::new()));
    let (first, second, third) = (Arc::clone(&log), Arc::clone(&log), Arc::clone(&log));

    let users = ResourceDef::builder("users", ResourceConfig::new("/users"))
        .endpoint(&ep)
        .before(&ep, move |args: CallArgs| {
            first.lock().unwrap().push("first");
            Ok(args)
        })
        .before(&ep, move |args: CallArgs| {
            second.lock().unwrap().push("second");
            match args.get("id").and_then(Value::as_i64) {
                Some(id) if id > 0 => Ok(args),
                _ => Err(ValidatorError::new("User ID must be positive")),
            }
        })
        .before(&ep, move |args: CallArgs| {
            third.lock().unwrap().push("third");
            Ok(args)
        })
        .build()
        .unwrap();
    let mock = Arc::new(MockTransport::json(200, json!({"id": 1, "name": "Ann"})));
    let bound = users_client(&users, &mock).resource(&users).unwrap().bind(&ep).unwrap();

    let err = bound.call(CallArgs::new().arg("id", -1)).unwrap_err();
    assert!(matches!(
        err,
        ApiError::Validator {
            mode: ValidatorMode::Before,
            ..
        }
    ));
    assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
    assert_eq!(mock.calls(), 0);

    log.lock().unwrap().clear();
    bound.call(CallArgs::new().arg("id", 1)).unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["first", "second", "third"]);
    assert_eq!(mock.calls(), 1);
}

#[test]
fn before_validator_output_feeds_the_request() {
    let ep = get_user();
    let users = ResourceDef::builder("users", ResourceConfig::new("/users"))
        .endpoint(&ep)
        .before(&ep, |mut args: CallArgs| {
            if args.get("id").is_none() {
                args.set("id", 1);
            }
            Ok(args)
        })
        .build()
        .unwrap();
    let mock = Arc::new(MockTransport::json(200, json!({"id": 1, "name": "Alice"})));
    let bound = users_client(&users, &mock).resource(&users).unwrap().bind(&ep).unwrap();

    let response = bound.call(CallArgs::new()).unwrap();
    assert_eq!(response.data.id, 1);
    assert_eq!(mock.last_request().url.path(), "/users/1");
}

#[test]
fn wrap_validator_controls_transport_invocations() {
    let ep = get_user();
    let twice: Endpoint<JsonFormat<User>> = Endpoint::get("get_user_twice", "/{id}").build().unwrap();

    let users = ResourceDef::builder("users", ResourceConfig::new("/users"))
        .endpoint(&ep)
        .endpoint(&twice)
        .wrap(&ep, |_next: Next<User>, _args: CallArgs| async {
            Ok::<_, ApiError>(DataResponse {
                status_code: 200,
                headers: Default::default(),
                url: url::Url::parse("https://cache.local/users/1").unwrap(),
                elapsed: Default::default(),
                data: User {
                    id: 1,
                    name: "Cached".to_string(),
                    email: None,
                },
            })
        })
        .wrap(&twice, |next: Next<User>, args: CallArgs| async move {
            let _ = next.run(args.clone()).await?;
            next.run(args).await
        })
        .build()
        .unwrap();
    let mock = Arc::new(MockTransport::json(200, json!({"id": 1, "name": "Ann"})));
    let resource = users_client(&users, &mock).resource(&users).unwrap();

    let cached = resource.bind(&ep).unwrap().call(CallArgs::new().arg("id", 1)).unwrap();
    assert_eq!(cached.data.name, "Cached");
    assert_eq!(mock.calls(), 0);

    let fetched = resource.bind(&twice).unwrap().call(CallArgs::new().arg("id", 1)).unwrap();
    assert_eq!(fetched.data.name, "Ann");
    assert_eq!(mock.calls(), 2);
}

#[test]
fn request_body_missing_required_field_is_rejected() {
    let create: Endpoint<JsonFormat<User>> = Endpoint::post("create_user", "/")
        .request::<CreateUser>()
        .build()
        .unwrap();
    let users = ResourceDef::builder("users", ResourceConfig::new("/users"))
        .endpoint(&create)
        .build()
        .unwrap();
    let mock = Arc::new(MockTransport::json(201, json!({"id": 2, "name": "John"})));
    let bound = users_client(&users, &mock).resource(&users).unwrap().bind(&create).unwrap();

    let err = bound.call(CallArgs::new().json(json!({"name": "John"}))).unwrap_err();
    match &err {
        ApiError::RequestValidation { errors, raw, .. } => {
            assert_eq!(errors[0].field.as_deref(), Some("email"));
            assert_eq!(raw.as_ref(), Some(&json!({"name": "John"})));
        }
        other => panic!("expected request validation error, got {other:?}"),
    }
    assert_eq!(err.field_errors().len(), 1);
    assert_eq!(mock.calls(), 0);

    let created = bound
        .call(CallArgs::new().json(json!({"name": "John", "email": "j@x.com"})))
        .unwrap();
    assert_eq!(created.status_code, 201);
    assert_eq!(
        mock.last_request().body,
        Some(restbind::Body::Json(json!({"name": "John", "email": "j@x.com"})))
    );
}

#[test]
fn validated_body_round_trips_through_echo() {
    let create: Endpoint<JsonFormat<CreateUser>> = Endpoint::post("echo_user", "/echo")
        .request::<CreateUser>()
        .build()
        .unwrap();
    let payload = json!({"name": "John", "email": "j@x.com"});
    let mock = Arc::new(MockTransport::json(200, payload.clone()));
    let client = BlockingClient::builder(config())
        .endpoint(&create)
        .transport(blocking(&mock))
        .build()
        .unwrap();

    let echoed = client.bind(&create).unwrap().call(CallArgs::new().json(payload)).unwrap();
    let sent = match mock.last_request().body {
        Some(restbind::Body::Json(value)) => value,
        other => panic!("expected a JSON body, got {other:?}"),
    };
    assert_eq!(serde_json::to_value(&echoed.data).unwrap(), sent);
}

#[test]
fn after_validator_maps_not_found_to_none() {
    let ep: Endpoint<JsonFormat<Option<User>>> = Endpoint::get("get_user", "/{id}").build().unwrap();
    let users = ResourceDef::builder("users", ResourceConfig::new("/users"))
        .endpoint(&ep)
        .after(&ep, |response: DataResponse<Option<User>>| {
            if response.status_code == 404 {
                Ok(response.with_data(None))
            } else {
                Ok(response)
            }
        })
        .build()
        .unwrap();
    let mock = Arc::new(MockTransport::json(404, json!({"id": 999, "name": "NotFound"})));
    let bound = users_client(&users, &mock).resource(&users).unwrap().bind(&ep).unwrap();

    let response = bound.call(CallArgs::new().arg("id", 999)).unwrap();
    assert_eq!(response.status_code, 404);
    assert!(response.is_client_error());
    assert_eq!(response.data, None);
}

#[test]
fn non_success_without_after_validators_is_http_error() {
    let ep = get_user();
    let users = ResourceDef::builder("users", ResourceConfig::new("/users"))
        .endpoint(&ep)
        .build()
        .unwrap();
    let mock = Arc::new(MockTransport::json(503, json!({"error": "down"})));
    let bound = users_client(&users, &mock).resource(&users).unwrap().bind(&ep).unwrap();

    let err = bound.call(CallArgs::new().arg("id", 1)).unwrap_err();
    assert_eq!(err.status_code(), Some(503));
    assert!(err.is_retryable());
    match err {
        ApiError::Http(http) => assert_eq!(http.body_text(), r#"{"error":"down"}"#),
        other => panic!("expected HTTP error, got {other:?}"),
    }
}

#[test]
fn raise_on_error_disabled_hands_back_decoded_body() {
    let ep: Endpoint<JsonFormat<Value>> = Endpoint::get("get_user", "/{id}").build().unwrap();
    let users = ResourceDef::builder("users", ResourceConfig::new("/users").with_raise_on_error(false))
        .endpoint(&ep)
        .build()
        .unwrap();
    let mock = Arc::new(MockTransport::json(422, json!({"detail": "bad id"})));
    let bound = users_client(&users, &mock).resource(&users).unwrap().bind(&ep).unwrap();

    let response = bound.call(CallArgs::new().arg("id", "x")).unwrap();
    assert_eq!(response.status_code, 422);
    assert_eq!(response.data["detail"], "bad id");
}

#[test]
fn response_type_mismatch_is_response_validation_error() {
    let ep = get_user();
    let users = ResourceDef::builder("users", ResourceConfig::new("/users"))
        .endpoint(&ep)
        .build()
        .unwrap();
    let mock = Arc::new(MockTransport::json(200, json!({"id": "one"})));
    let bound = users_client(&users, &mock).resource(&users).unwrap().bind(&ep).unwrap();

    let err = bound.call(CallArgs::new().arg("id", 1)).unwrap_err();
    assert!(matches!(err, ApiError::ResponseValidation { status: 200, .. }));
}

#[test]
fn configuration_layers_reach_the_request() {
    let ep: Endpoint<JsonFormat<Value>> = Endpoint::get("list_users", "/")
        .header("X-Endpoint", "e")
        .timeout(std::time::Duration::from_secs(2))
        .build()
        .unwrap();
    let users = ResourceDef::builder(
        "users",
        ResourceConfig::new("/users")
            .with_header("x-client", "resource")
            .with_timeout(std::time::Duration::from_secs(10)),
    )
    .endpoint(&ep)
    .build()
    .unwrap();
    let mock = Arc::new(MockTransport::json(200, json!([])));
    let client = BlockingClient::builder(config().with_header("X-Client", "client"))
        .resource(&users)
        .transport(blocking(&mock))
        .build()
        .unwrap();

    client
        .resource(&users)
        .unwrap()
        .bind(&ep)
        .unwrap()
        .call(CallArgs::new().arg("page", 2))
        .unwrap();

    let sent = mock.last_request();
    assert_eq!(sent.url.as_str(), "https://api.example.com/users");
    assert_eq!(sent.query, vec![("page".to_string(), "2".to_string())]);
    assert_eq!(sent.timeout, std::time::Duration::from_secs(2));
    assert_eq!(sent.headers.get("x-client").map(String::as_str), Some("resource"));
    assert!(!sent.headers.contains_key("X-Client"));
    assert_eq!(sent.headers.get("X-Endpoint").map(String::as_str), Some("e"));
}

#[test]
fn concurrent_first_binds_agree() {
    let ep = get_user();
    let users = ResourceDef::builder("users", ResourceConfig::new("/users"))
        .endpoint(&ep)
        .build()
        .unwrap();
    let mock = Arc::new(MockTransport::json(200, json!({"id": 1, "name": "Ann"})));
    let client = users_client(&users, &mock);

    std::thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|| {
                let bound = client.resource(&users).unwrap().bind(&ep).unwrap();
                assert_eq!(bound.call(CallArgs::new().arg("id", 1)).unwrap().data.name, "Ann");
            });
        }
    });
    assert_eq!(mock.calls(), 8);
}

#[test]
fn dot_segment_path_value_never_reaches_transport() {
    let ep: Endpoint<JsonFormat<Value>> = Endpoint::get("get_profile", "/users/{id}/profile").build().unwrap();
    let mock = Arc::new(MockTransport::json(200, json!({})));
    let client = BlockingClient::builder(config())
        .endpoint(&ep)
        .transport(blocking(&mock))
        .build()
        .unwrap();
    let bound = client.bind(&ep).unwrap();

    for dots in ["..", "."] {
        let err = bound.call(CallArgs::new().arg("id", dots)).unwrap_err();
        assert!(matches!(err, ApiError::RequestValidation { .. }));
        assert!(err.is_pre_send());
    }
    assert_eq!(mock.calls(), 0);
}

#[test]
fn client_cookie_header_keeps_endpoint_cookies() {
    let ep: Endpoint<JsonFormat<Value>> = Endpoint::get("list_users", "/users").cookie("b", "2").build().unwrap();
    let mock = Arc::new(MockTransport::json(200, json!([])));
    let client = BlockingClient::builder(config().with_header("Cookie", "a=1"))
        .endpoint(&ep)
        .transport(blocking(&mock))
        .build()
        .unwrap();

    client.bind(&ep).unwrap().call(CallArgs::new()).unwrap();

    let pairs = mock.last_request().header_pairs();
    assert!(pairs.contains(&("Cookie".to_string(), "a=1; b=2".to_string())));
}

#[test]
fn blocking_wrap_can_await_tokio_timers() {
    let ep = get_user();
    let users = ResourceDef::builder("users", ResourceConfig::new("/users"))
        .endpoint(&ep)
        .wrap(&ep, |next: Next<User>, args: CallArgs| async move {
            match next.run(args.clone()).await {
                Err(err) if err.is_retryable() => {
                    tokio::time::sleep(std::time::Duration::from_millis(1)).await;
                    next.run(args).await
                }
                other => other,
            }
        })
        .build()
        .unwrap();
    let mock = Arc::new(MockTransport::json(502, json!({"error": "bad gateway"})));
    let bound = users_client(&users, &mock).resource(&users).unwrap().bind(&ep).unwrap();

    let err = bound.call(CallArgs::new().arg("id", 1)).unwrap_err();
    assert_eq!(err.status_code(), Some(502));
    assert_eq!(mock.calls(), 2);
}

#[test]
fn undecodable_error_body_skips_after_validators() {
    let ep: Endpoint<JsonFormat<Option<User>>> = Endpoint::get("get_user", "/{id}").build().unwrap();
    let ran = Arc::new(Mutex::new(false));
    let seen = Arc::clone(&ran);
    let users = ResourceDef::builder("users", ResourceConfig::new("/users"))
        .endpoint(&ep)
        .after(&ep, move |response: DataResponse<Option<User>>| {
            *seen.lock().unwrap() = true;
            Ok(response.with_data(None))
        })
        .build()
        .unwrap();
    let mock = Arc::new(MockTransport::json(404, json!({"detail": "Not found"})));
    let bound = users_client(&users, &mock).resource(&users).unwrap().bind(&ep).unwrap();

    let err = bound.call(CallArgs::new().arg("id", 9)).unwrap_err();
    assert!(matches!(err, ApiError::Http(ref http) if http.status == 404));
    assert!(!*ran.lock().unwrap());
}
