use std::collections::HashMap;
use std::sync::Arc;

use jscore::{
    check_script_syntax, evaluate_script, global_object, host_object, ClassKey, ClassRegistry,
    Error, GlobalContext, HostValue, JsType, Object, TokenTable, Value,
};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

struct Person {
    name: String,
    age: u32,
    password: String,
    friends: Vec<String>,
}

host_object!(Person {
    name,
    age: "years,omitempty",
    password: "-",
    friends,
});

fn person(name: &str) -> Arc<Person> {
    Arc::new(Person {
        name: name.into(),
        age: 36,
        password: "hunter2".into(),
        friends: vec!["Bob".into()],
    })
}

#[test]
fn wrapped_object_round_trips_by_identity() {
    init();
    let mut ctx = GlobalContext::new();
    let scope = &mut ctx.scope();

    let ada = person("Ada");
    let object = Object::wrap(scope, ada.clone()).unwrap();
    let back = object.value().to_host(scope).unwrap();
    assert!(Arc::ptr_eq(&back.downcast::<Person>().unwrap(), &ada));

    // Also after a trip through script code
    global_object(scope).set(scope, "ada", object.value()).unwrap();
    let from_script = evaluate_script(scope, "[ada][0]").unwrap();
    let back = from_script.to_host(scope).unwrap();
    assert_eq!(back.as_object().unwrap().type_name(), std::any::type_name::<Person>());
    assert!(back.as_object().unwrap().same_as(&ada));
}

#[test]
fn dynamic_host_value_wraps() {
    init();
    let mut ctx = GlobalContext::new();
    let scope = &mut ctx.scope();

    let ada = person("Ada");
    let value = Value::new(scope, &HostValue::from(ada.clone())).unwrap();
    assert_eq!(value.js_type(scope).unwrap(), JsType::Object);
    let object = value.to_object(scope).unwrap();
    assert!(object.host(scope).unwrap().unwrap().same_as(&ada));

    let object = Object::new_host(scope, &HostValue::from(ada.clone())).unwrap();
    assert!(object.token(scope).is_some());
}

#[test]
fn script_sees_exposed_fields_only() {
    init();
    let mut ctx = GlobalContext::new();
    let scope = &mut ctx.scope();

    let object = Object::wrap(scope, person("Ada")).unwrap();
    global_object(scope).set(scope, "p", object.value()).unwrap();

    let name = evaluate_script(scope, "p.name").unwrap();
    assert_eq!(name.to_rust_string(scope).unwrap(), "Ada");
    let years = evaluate_script(scope, "p.years").unwrap();
    assert_eq!(years.to_number(scope).unwrap(), 36.0);
    let friends = evaluate_script(scope, "p.friends.length + ':' + p.friends[0]").unwrap();
    assert_eq!(friends.to_rust_string(scope).unwrap(), "1:Bob");

    // Excluded and renamed-away names are simply absent
    for script in ["p.password", "p.age"] {
        let value = evaluate_script(scope, script).unwrap();
        assert_eq!(value.js_type(scope).unwrap(), JsType::Undefined, "{}", script);
    }
    let has = evaluate_script(scope, "'password' in p").unwrap();
    assert!(!has.to_boolean(scope));

    // Prototype lookups still work
    let text = evaluate_script(scope, "p.toString()").unwrap();
    assert_eq!(text.to_rust_string(scope).unwrap(), "[object Object]");
}

#[test]
fn field_reads_reflect_current_state() {
    init();

    struct Counter {
        hits: std::sync::atomic::AtomicU32,
    }

    impl jscore::HostObject for Counter {
        fn fields() -> jscore::Fields<Self> {
            jscore::Fields::new().field("hits", "", |c: &Counter| {
                c.hits.load(std::sync::atomic::Ordering::SeqCst).into()
            })
        }
    }

    let mut ctx = GlobalContext::new();
    let scope = &mut ctx.scope();
    let counter = Arc::new(Counter {
        hits: Default::default(),
    });
    let object = Object::wrap(scope, counter.clone()).unwrap();

    assert_eq!(object.get(scope, "hits").unwrap().to_number(scope).unwrap(), 0.0);
    counter.hits.store(5, std::sync::atomic::Ordering::SeqCst);
    assert_eq!(object.get(scope, "hits").unwrap().to_number(scope).unwrap(), 5.0);
}

#[test]
fn array_projects_in_order() {
    init();
    let mut ctx = GlobalContext::new();
    let scope = &mut ctx.scope();

    let one = Value::number(scope, 1.0);
    let a = Value::string(scope, "a").unwrap();
    let array = Object::new_array(scope, &[one, a]);
    assert_eq!(
        array.value().to_host(scope).unwrap(),
        HostValue::Array(vec![HostValue::Number(1.0), HostValue::String("a".into())])
    );
}

#[test]
fn plain_object_projects_to_map() {
    init();
    let mut ctx = GlobalContext::new();
    let scope = &mut ctx.scope();

    let object = Object::new(scope);
    let p1 = Value::number(scope, 1.0);
    let p2 = Value::string(scope, "two").unwrap();
    let p3 = Value::boolean(scope, true);
    object.set(scope, "p1", p1).unwrap();
    object.set(scope, "p2", p2).unwrap();
    object.set(scope, "p3", p3).unwrap();

    let mut expected = HashMap::new();
    expected.insert("p1".to_string(), HostValue::Number(1.0));
    expected.insert("p2".to_string(), HostValue::String("two".into()));
    expected.insert("p3".to_string(), HostValue::Bool(true));
    assert_eq!(object.value().to_host(scope).unwrap(), HostValue::Map(expected));
}

#[test]
fn nested_wrapped_objects_keep_identity() {
    init();
    let mut ctx = GlobalContext::new();
    let scope = &mut ctx.scope();

    let ada = person("Ada");
    let object = Object::wrap(scope, ada.clone()).unwrap();
    global_object(scope).set(scope, "ada", object.value()).unwrap();

    let value = evaluate_script(scope, "({ owner: ada, tags: ['x'] })").unwrap();
    let host = value.to_host(scope).unwrap();
    let map = host.as_map().unwrap();
    assert!(map["owner"].as_object().unwrap().same_as(&ada));
    assert_eq!(map["tags"], HostValue::Array(vec![HostValue::String("x".into())]));
}

#[test]
fn type_classification() {
    init();
    let mut ctx = GlobalContext::new();
    let scope = &mut ctx.scope();

    let cases = [
        (Value::null(scope), JsType::Null, "null"),
        (Value::number(scope, 3.0), JsType::Number, "number"),
        (Value::boolean(scope, false), JsType::Boolean, "boolean"),
        (Value::string(scope, "").unwrap(), JsType::String, "string"),
        (Object::new(scope).value(), JsType::Object, "object"),
    ];
    for (value, ty, name) in cases {
        assert_eq!(value.js_type(scope).unwrap(), ty);
        assert_eq!(ty.to_string(), name);
    }
    assert_eq!(JsType::from_code(99).to_string(), "unknown JS type: 99");
}

#[test]
fn syntax_check_and_evaluation() {
    init();
    let mut ctx = GlobalContext::new();
    let scope = &mut ctx.scope();

    assert!(check_script_syntax(scope, "12.34"));
    assert!(check_script_syntax(scope, "[1,2,3]"));

    let value = evaluate_script(scope, "12.34").unwrap();
    assert_eq!(value.js_type(scope).unwrap(), JsType::Number);
    assert_eq!(value.to_rust_string(scope).unwrap(), "12.34");

    let err = evaluate_script(scope, "missing.field").unwrap_err();
    assert!(matches!(err, Error::Script(_)));
    assert!(err.to_string().contains("ReferenceError"));
}

#[test]
fn collected_object_releases_its_token_once() {
    init();
    let mut ctx = GlobalContext::new();
    let ada = person("Ada");

    let token = {
        let scope = &mut ctx.scope();
        let object = Object::wrap(scope, ada.clone()).unwrap();
        object.token(scope).unwrap()
    };
    assert!(TokenTable::global().contains(token));
    assert_eq!(Arc::strong_count(&ada), 2);
    assert_eq!(ctx.live_objects(), 1);

    for _ in 0..10 {
        ctx.collect_garbage();
        if !TokenTable::global().contains(token) {
            break;
        }
    }

    assert!(!TokenTable::global().contains(token));
    assert_eq!(Arc::strong_count(&ada), 1);
    assert_eq!(ctx.live_objects(), 0);

    // Nothing is left for teardown to release
    ctx.release();
    assert_eq!(Arc::strong_count(&ada), 1);
}

#[test]
fn reachable_object_survives_collection() {
    init();
    let mut ctx = GlobalContext::new();
    let ada = person("Ada");

    let token = {
        let scope = &mut ctx.scope();
        let object = Object::wrap(scope, ada.clone()).unwrap();
        global_object(scope).set(scope, "kept", object.value()).unwrap();
        object.token(scope).unwrap()
    };
    ctx.collect_garbage();
    assert!(TokenTable::global().contains(token));
    assert_eq!(ctx.live_objects(), 1);

    {
        let scope = &mut ctx.scope();
        let name = evaluate_script(scope, "kept.name").unwrap();
        assert_eq!(name.to_rust_string(scope).unwrap(), "Ada");
    }

    // Releasing the context releases what the engine still holds
    drop(ctx);
    assert!(!TokenTable::global().contains(token));
    assert_eq!(Arc::strong_count(&ada), 1);
}

#[test]
fn descriptor_is_shared_across_instances() {
    init();

    struct Sensor {
        id: u32,
    }

    host_object!(Sensor { id });

    let mut ctx = GlobalContext::new();
    let scope = &mut ctx.scope();

    let before = ClassRegistry::global().registrations();
    let a = Object::wrap(scope, Arc::new(Sensor { id: 1 })).unwrap();
    let b = Object::wrap(scope, Arc::new(Sensor { id: 2 })).unwrap();

    let (ta, tb) = (a.token(scope).unwrap(), b.token(scope).unwrap());
    assert_ne!(ta, tb);
    assert_ne!(a, b);

    let key = ClassKey::of::<Sensor>();
    let first = ClassRegistry::global().class_for(&key);
    let second = ClassRegistry::global().class_for(&key);
    assert!(Arc::ptr_eq(&first, &second));
    assert!(ClassRegistry::global().registrations() >= before + 1);
    assert_eq!(first.exposed_names().collect::<Vec<_>>(), vec!["id"]);

    assert_eq!(a.get(scope, "id").unwrap().to_number(scope).unwrap(), 1.0);
    assert_eq!(b.get(scope, "id").unwrap().to_number(scope).unwrap(), 2.0);
}

#[test]
fn released_context_leaves_no_trace() {
    init();
    let ada = person("Ada");

    let mut first = GlobalContext::new();
    {
        let scope = &mut first.scope();
        let object = Object::wrap(scope, ada.clone()).unwrap();
        global_object(scope).set(scope, "x", object.value()).unwrap();
    }
    first.release();
    assert_eq!(Arc::strong_count(&ada), 1);

    let mut second = GlobalContext::new();
    assert_eq!(second.live_objects(), 0);
    let scope = &mut second.scope();
    let value = evaluate_script(scope, "typeof x").unwrap();
    assert_eq!(value.to_rust_string(scope).unwrap(), "undefined");
}

#[test]
fn inherited_reads_see_host_fields() {
    init();
    let mut ctx = GlobalContext::new();
    let scope = &mut ctx.scope();

    let object = Object::wrap(scope, person("Ada")).unwrap();
    global_object(scope).set(scope, "p", object.value()).unwrap();

    for script in [
        "Object.create(p).name === 'Ada'",
        "Reflect.get(p, 'name', {}) === 'Ada'",
        "Object.create(Object.create(p)).years === 36",
    ] {
        let value = evaluate_script(scope, script).unwrap();
        assert!(value.to_boolean(scope), "{}", script);
    }
}

#[test]
fn contexts_release_in_any_order() {
    init();
    let ada = person("Ada");
    let bob = person("Bob");

    let mut first = GlobalContext::new();
    {
        let scope = &mut first.scope();
        let object = Object::wrap(scope, ada.clone()).unwrap();
        global_object(scope).set(scope, "x", object.value()).unwrap();
    }
    let mut second = GlobalContext::new();
    {
        let scope = &mut second.scope();
        let object = Object::wrap(scope, bob.clone()).unwrap();
        global_object(scope).set(scope, "x", object.value()).unwrap();
    }

    first.release();
    assert_eq!(Arc::strong_count(&ada), 1);
    assert_eq!(Arc::strong_count(&bob), 2);

    {
        let scope = &mut second.scope();
        let name = evaluate_script(scope, "x.name").unwrap();
        assert_eq!(name.to_rust_string(scope).unwrap(), "Bob");
    }
    second.release();
    assert_eq!(Arc::strong_count(&bob), 1);
}
