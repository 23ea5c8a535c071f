// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! IIOP integration tests
//!
//! Client and server ORBs in one process, talking over real TCP sockets on
//! the loopback interface.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use yoko::adapter::unknown_operation;
use yoko::exception::minor;
use yoko::{
    Any, ByteOrder, CallError, Delegate, ExceptionList, Helper, Idl, InputStream, ObjectRef,
    ObjectStub, Orb, OrbConfig, ResponseHandler, Servant, SystemException, SystemExceptionKind,
};

const CALCULATOR_ID: &str = "IDL:test/Calculator:1.0";

#[derive(Debug, Clone, PartialEq, Idl)]
#[idl(id = "IDL:test/Point:1.0")]
struct Point {
    x: f64,
    y: f64,
    label: String,
}

#[derive(Debug, Clone, PartialEq, Idl)]
#[idl(id = "IDL:test/DivideByZero:1.0", exception)]
struct DivideByZero {
    dividend: i32,
}

#[derive(Debug, Clone, PartialEq)]
enum CalcError {
    DivideByZero(DivideByZero),
}

impl fmt::Display for CalcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalcError::DivideByZero(e) => write!(f, "{}", e),
        }
    }
}

#[derive(Default)]
struct Calculator {
    pings: AtomicU32,
}

impl Servant for Calculator {
    fn repository_ids(&self) -> &[&'static str] {
        &[CALCULATOR_ID]
    }

    fn dispatch(
        &self,
        operation: &str,
        input: &mut InputStream,
        handler: &mut ResponseHandler,
    ) -> Result<(), SystemException> {
        match operation {
            "add" => {
                let a = i32::read(input)?;
                let b = i32::read(input)?;
                i32::write(handler.create_reply()?, &a.wrapping_add(b))
            }
            "divide" => {
                let a = i32::read(input)?;
                let b = i32::read(input)?;
                if b == 0 {
                    let out = handler.create_exception_reply()?;
                    return DivideByZero::write(out, &DivideByZero { dividend: a });
                }
                i32::write(handler.create_reply()?, &(a / b))
            }
            "scale" => {
                let point = Point::read(input)?;
                let factor = f64::read(input)?;
                let scaled = Point {
                    x: point.x * factor,
                    y: point.y * factor,
                    label: point.label,
                };
                Point::write(handler.create_reply()?, &scaled)
            }
            "echo_any" => {
                let any = Any::read(input)?;
                any.write(handler.create_reply()?)
            }
            "ping" => {
                self.pings.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            "explode" => panic!("servant failure"),
            other => Err(unknown_operation(other)),
        }
    }
}

struct CalculatorStub {
    delegate: Delegate,
}

impl ObjectStub for CalculatorStub {
    fn delegate(&self) -> &Delegate {
        &self.delegate
    }
}

impl CalculatorStub {
    fn new(orb: &Orb, obj: ObjectRef) -> Self {
        Self {
            delegate: Delegate::new(orb, obj),
        }
    }

    fn add(&self, a: i32, b: i32) -> Result<i32, SystemException> {
        self.delegate
            .call(
                "add",
                true,
                |out| {
                    i32::write(out, &a)?;
                    i32::write(out, &b)
                },
                &ExceptionList::none(),
                |input| i32::read(input),
            )
            .map_err(CallError::into_system)
    }

    fn divide(&self, a: i32, b: i32) -> Result<i32, CallError<CalcError>> {
        self.delegate.call(
            "divide",
            true,
            |out| {
                i32::write(out, &a)?;
                i32::write(out, &b)
            },
            &ExceptionList::new().with(CalcError::DivideByZero),
            |input| i32::read(input),
        )
    }

    fn scale(&self, point: &Point, factor: f64) -> Result<Point, SystemException> {
        self.delegate
            .call(
                "scale",
                true,
                |out| {
                    Point::write(out, point)?;
                    f64::write(out, &factor)
                },
                &ExceptionList::none(),
                |input| Point::read(input),
            )
            .map_err(CallError::into_system)
    }

    fn echo_any(&self, any: &Any) -> Result<Any, SystemException> {
        self.delegate
            .call(
                "echo_any",
                true,
                |out| any.write(out),
                &ExceptionList::none(),
                |input| Any::read(input),
            )
            .map_err(CallError::into_system)
    }

    fn ping(&self) -> Result<(), SystemException> {
        self.delegate
            .call("ping", false, |_| Ok(()), &ExceptionList::none(), |_| Ok(()))
            .map_err(CallError::into_system)
    }

    fn call_void(&self, operation: &str) -> Result<(), SystemException> {
        self.delegate
            .call(operation, true, |_| Ok(()), &ExceptionList::none(), |_| Ok(()))
            .map_err(CallError::into_system)
    }
}

fn server_orb() -> Orb {
    let orb = Orb::init(OrbConfig::default()).expect("Failed to create server ORB");
    orb.listen().expect("Failed to listen");
    orb
}

fn client_orb(order: ByteOrder) -> Orb {
    let mut config = OrbConfig::default().with_byte_order(order);
    config.read_timeout_ms = Some(5_000);
    Orb::init(config).expect("Failed to create client ORB")
}

fn activate_calculator(orb: &Orb) -> (Arc<Calculator>, ObjectRef) {
    let servant = Arc::new(Calculator::default());
    let obj = orb
        .activate(servant.clone())
        .expect("Failed to activate servant");
    (servant, obj)
}

#[test]
fn test_invocations_in_both_byte_orders() {
    let server = server_orb();
    let (_, obj) = activate_calculator(&server);
    let ior = server.object_to_string(&obj).unwrap();

    for order in [ByteOrder::BigEndian, ByteOrder::LittleEndian] {
        let client = client_orb(order);
        let stub = CalculatorStub::new(&client, client.string_to_object(&ior).unwrap());

        assert_eq!(stub.add(40, 2).unwrap(), 42);
        assert!(stub.is_a(CALCULATOR_ID).unwrap());
        assert!(stub.is_a("IDL:omg.org/CORBA/Object:1.0").unwrap());
        assert!(!stub.is_a("IDL:test/Other:1.0").unwrap());
        assert!(!stub.non_existent().unwrap());

        let point = Point {
            x: 1.5,
            y: -2.0,
            label: "origin".into(),
        };
        let scaled = stub.scale(&point, 2.0).unwrap();
        assert_eq!(
            scaled,
            Point {
                x: 3.0,
                y: -4.0,
                label: "origin".into()
            }
        );

        client.destroy();
    }
    server.destroy();
}

#[test]
fn test_user_exception_roundtrip() {
    let server = server_orb();
    let (_, obj) = activate_calculator(&server);
    let client = client_orb(ByteOrder::LittleEndian);
    let stub = CalculatorStub::new(&client, obj);

    assert_eq!(stub.divide(9, 3).unwrap(), 3);
    match stub.divide(7, 0) {
        Err(CallError::User(CalcError::DivideByZero(e))) => assert_eq!(e.dividend, 7),
        other => panic!("expected DivideByZero, got {:?}", other),
    }
}

#[test]
fn test_any_survives_the_wire() {
    let server = server_orb();
    let (_, obj) = activate_calculator(&server);
    let client = client_orb(ByteOrder::BigEndian);
    let stub = CalculatorStub::new(&client, obj);

    let point = Point {
        x: 0.25,
        y: 8.0,
        label: "p".into(),
    };
    let mut any = Any::new();
    Point::insert(&mut any, &point).unwrap();

    let echoed = stub.echo_any(&any).unwrap();
    assert!(echoed.type_code().equal(&Point::type_code()));
    assert_eq!(Point::extract(&echoed).unwrap(), point);
}

#[test]
fn test_system_exceptions_from_server() {
    let server = server_orb();
    let (_, obj) = activate_calculator(&server);
    let client = client_orb(ByteOrder::BigEndian);
    let stub = CalculatorStub::new(&client, obj.clone());

    let err = stub.call_void("missing").unwrap_err();
    assert_eq!(err.kind, SystemExceptionKind::BadOperation);
    assert_eq!(err.minor, minor::NO_SUCH_OPERATION);

    let err = stub.call_void("explode").unwrap_err();
    assert_eq!(err.kind, SystemExceptionKind::Unknown);
    assert_eq!(err.minor, minor::SERVANT_PANIC);

    // the server keeps serving after a servant panic
    assert_eq!(stub.add(1, 1).unwrap(), 2);

    server
        .adapter()
        .deactivate_object(&obj.object_key().unwrap())
        .unwrap();
    assert!(stub.non_existent().unwrap());
    let err = stub.add(1, 1).unwrap_err();
    assert_eq!(err.kind, SystemExceptionKind::ObjectNotExist);
}

#[test]
fn test_oneway_request() {
    let server = server_orb();
    let (servant, obj) = activate_calculator(&server);
    let client = client_orb(ByteOrder::BigEndian);
    let stub = CalculatorStub::new(&client, obj);

    stub.ping().unwrap();
    stub.ping().unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    while servant.pings.load(Ordering::SeqCst) < 2 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }
    assert_eq!(servant.pings.load(Ordering::SeqCst), 2);
}

#[test]
fn test_corbaloc_follows_boot_forward() {
    let server = server_orb();
    let (_, obj) = activate_calculator(&server);
    server.boot_manager().add_binding(b"Calc", obj.clone());

    let endpoint = server.published_endpoint().unwrap();
    let client = client_orb(ByteOrder::BigEndian);
    let url = format!("corbaloc::{}/Calc", endpoint);
    let stub = CalculatorStub::new(&client, client.string_to_object(&url).unwrap());

    assert!(!stub.delegate().is_forwarded());
    assert_eq!(stub.add(2, 3).unwrap(), 5);
    assert!(stub.delegate().is_forwarded());
    assert!(stub.delegate().effective_target().is_equivalent(&obj));
    assert!(stub.delegate().locate().unwrap());
}

#[test]
fn test_forward_loop_hits_remarshal_limit() {
    let server = server_orb();
    let looping = server.create_reference(b"loop", CALCULATOR_ID).unwrap();
    server.adapter().set_forward(b"loop", looping.clone());

    let mut config = OrbConfig::default().with_max_remarshal(Some(3));
    config.read_timeout_ms = Some(5_000);
    let client = Orb::init(config).unwrap();
    let stub = CalculatorStub::new(&client, looping);

    let err = stub.add(1, 2).unwrap_err();
    assert_eq!(err.kind, SystemExceptionKind::Transient);
    assert_eq!(err.minor, minor::REMARSHAL_LIMIT);
}

#[test]
fn test_unreachable_server_is_transient() {
    let server = server_orb();
    let (_, obj) = activate_calculator(&server);
    server.destroy();

    let client = client_orb(ByteOrder::BigEndian);
    let stub = CalculatorStub::new(&client, obj);
    let err = stub.add(1, 2).unwrap_err();
    assert_eq!(err.kind, SystemExceptionKind::Transient);
}

#[test]
fn test_destroyed_client_orb_rejects_calls() {
    let server = server_orb();
    let (_, obj) = activate_calculator(&server);
    let client = client_orb(ByteOrder::BigEndian);
    let stub = CalculatorStub::new(&client, obj);
    assert_eq!(stub.add(1, 2).unwrap(), 3);

    client.destroy();
    let err = stub.add(1, 2).unwrap_err();
    assert_eq!(err.kind, SystemExceptionKind::BadInvOrder);
    assert_eq!(err.minor, minor::ORB_DESTROYED);
}

#[test]
fn test_giop_1_0_client() {
    let server = server_orb();
    let (_, obj) = activate_calculator(&server);

    let mut config = OrbConfig::default().with_giop_minor(0);
    config.read_timeout_ms = Some(5_000);
    let client = Orb::init(config).unwrap();
    let stub = CalculatorStub::new(&client, obj);
    assert_eq!(stub.add(-5, 3).unwrap(), -2);
}
