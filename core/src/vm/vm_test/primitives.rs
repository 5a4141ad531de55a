use super::*;

#[test]
fn test_concat_folds_left_to_right() {
    let vm = Machine::default();
    vm.push("a".into());
    vm.push(Val::Int(1));
    vm.push(Val::Number(2.5));
    vm.concat(3).unwrap();
    assert_eq!(vm.top(), 1);
    assert_eq!(vm.value(0), Some(Val::from("a12.5")));
    assert_eq!(vm.stats().snapshot().concat_operands, 3);
}

#[test]
fn test_concat_of_nothing_is_empty_string() {
    let vm = Machine::default();
    vm.concat(0).unwrap();
    assert_eq!(vm.value(0), Some(Val::from("")));
}

#[test]
fn test_failed_concat_consumes_operands() {
    let vm = Machine::default();
    vm.push(Val::Bool(true));
    vm.push("a".into());
    vm.push(Val::new_table());
    let err = vm.concat(2).unwrap_err();
    assert_eq!(err, Error::runtime("attempt to concatenate a table value"));
    assert_eq!(vm.top(), 1);
}

#[test]
fn test_arith_binary_and_unary() {
    let vm = Machine::default();
    vm.push(Val::Int(3));
    vm.push(Val::Int(4));
    vm.arith(ArithOp::Mul).unwrap();
    vm.arith(ArithOp::Unm).unwrap();
    assert_eq!(vm.top(), 1);
    assert_eq!(vm.value(0), Some(Val::Int(-12)));
    assert_eq!(vm.stats().count(Primitive::Arith), 2);
}

#[test]
fn test_arith_error_names_the_culprit() {
    let vm = Machine::default();
    vm.push(Val::Int(1));
    vm.push(Val::Nil);
    let err = vm.arith(ArithOp::Add).unwrap_err();
    assert_eq!(err.to_string(), "attempt to perform arithmetic on a nil value");
    assert_eq!(vm.top(), 0);
}

#[test]
fn test_compare_numbers_and_strings() {
    let vm = Machine::default();
    vm.push(Val::Int(1));
    vm.push(Val::Number(2.0));
    assert!(vm.compare(CompareOp::Lt).unwrap());
    vm.push("b".into());
    vm.push("a".into());
    assert!(!vm.compare(CompareOp::Le).unwrap());
    vm.push(Val::Int(1));
    vm.push("1".into());
    assert!(!vm.compare(CompareOp::Eq).unwrap());
    vm.push(Val::Int(1));
    vm.push("1".into());
    let err = vm.compare(CompareOp::Lt).unwrap_err();
    assert_eq!(err.to_string(), "attempt to compare number with string");
    assert_eq!(vm.top(), 0);
}

#[test]
fn test_index_and_new_index_on_plain_table() {
    let vm = Machine::default();
    vm.create_table(0, 0);
    vm.push("k".into());
    vm.push(Val::Int(7));
    vm.new_index_at(0).unwrap();
    vm.push("k".into());
    vm.index_at(0).unwrap();
    assert_eq!(vm.top(), 2);
    assert_eq!(vm.value(1), Some(Val::Int(7)));
}

#[test]
fn test_index_non_table_fails() {
    let vm = Machine::default();
    vm.push(Val::Int(5));
    vm.push("k".into());
    let err = vm.index_at(0).unwrap_err();
    assert_eq!(err.to_string(), "attempt to index a number value");
    assert_eq!(vm.top(), 1);
}

#[test]
fn test_index_follows_index_table() {
    let vm = Machine::default();
    vm.create_table(0, 0);
    vm.duplicate(0);
    vm.create_table(0, 0);
    vm.push("__index".into());
    vm.create_table(0, 0);
    vm.push("x".into());
    vm.push(Val::Int(42));
    vm.raw_set_at(4).unwrap();
    vm.raw_set_at(2).unwrap();
    vm.set_metatable().unwrap();
    assert_eq!(vm.top(), 1);
    vm.push("x".into());
    vm.index_at(0).unwrap();
    assert_eq!(vm.value(1), Some(Val::Int(42)));
    vm.push("y".into());
    vm.index_at(0).unwrap();
    assert_eq!(vm.value(2), Some(Val::Nil));
}

#[test]
fn test_index_function_handler_receives_table_and_key() {
    let vm = Machine::default();
    let handler: RawFn = Rc::new(|vm: &Machine| {
        let base = vm.frame_base();
        let key = vm.value(base + 1).unwrap_or_default();
        vm.push(Val::from(format!("got {key}")));
        Ok(1)
    });
    vm.create_table(0, 0);
    vm.duplicate(0);
    vm.create_table(0, 0);
    vm.push("__index".into());
    vm.push_closure(handler, 0);
    vm.raw_set_at(2).unwrap();
    vm.set_metatable().unwrap();
    vm.push("name".into());
    vm.index_at(0).unwrap();
    assert_eq!(vm.value(1), Some(Val::from("got name")));
    assert_eq!(vm.stats().count(Primitive::Call), 0);
}

#[test]
fn test_raw_access_requires_table() {
    let vm = Machine::default();
    vm.push(Val::Int(1));
    vm.push("k".into());
    assert!(vm.raw_get_at(0).is_err());
    assert_eq!(vm.top(), 1);
}

#[test]
fn test_set_list_fills_array_part() {
    let vm = Machine::default();
    vm.create_table(3, 0);
    vm.push(Val::Int(10));
    vm.push(Val::Int(20));
    vm.push(Val::Int(30));
    vm.set_list(3).unwrap();
    assert_eq!(vm.top(), 1);
    assert_eq!(vm.raw_len(0), 3);
    vm.len().unwrap();
    assert_eq!(vm.value(0), Some(Val::Int(3)));
}

#[test]
fn test_len_of_string_and_error() {
    let vm = Machine::default();
    vm.push("hello".into());
    vm.len().unwrap();
    assert_eq!(vm.value(0), Some(Val::Int(5)));
    vm.push(Val::Bool(true));
    let err = vm.len().unwrap_err();
    assert_eq!(err.to_string(), "attempt to get length of a boolean value");
    assert_eq!(vm.top(), 1);
}

#[test]
fn test_metatable_round_trip() {
    let vm = Machine::default();
    vm.create_table(0, 0);
    vm.duplicate(0);
    vm.create_table(0, 0);
    vm.set_metatable().unwrap();
    vm.duplicate(0);
    vm.get_metatable();
    assert_eq!(vm.value(1).map(|v| v.type_of().name()), Some("table"));
    vm.push(Val::Int(1));
    vm.get_metatable();
    assert_eq!(vm.value(2), Some(Val::Nil));
}

#[test]
fn test_set_metatable_rejects_bad_metatable() {
    let vm = Machine::default();
    vm.create_table(0, 0);
    vm.push(Val::Int(3));
    assert!(vm.set_metatable().is_err());
    assert_eq!(vm.top(), 0);
}

#[test]
fn test_upvalues_of_closure_on_stack() {
    let vm = Machine::default();
    vm.push(Val::Int(1));
    vm.push(Val::Int(2));
    let f: RawFn = Rc::new(|_: &Machine| Ok(0));
    vm.push_closure(f, 2);
    assert_eq!(vm.top(), 1);
    vm.get_upvalue(Some(0), 2).unwrap();
    assert_eq!(vm.value(1), Some(Val::Int(2)));
    vm.push("x".into());
    vm.set_upvalue(Some(0), 1).unwrap();
    vm.get_upvalue(Some(0), 1).unwrap();
    assert_eq!(vm.value(2), Some(Val::from("x")));
    let err = vm.get_upvalue(Some(0), 3).unwrap_err();
    assert_eq!(err.to_string(), "upvalue index 3 out of range");
    assert!(vm.get_upvalue(None, 1).is_err());
}

#[test]
fn test_registry_refs_are_distinct() {
    let vm = Machine::default();
    vm.push(Val::Int(1));
    let a = vm.registry_ref().unwrap();
    vm.push(Val::Int(2));
    let b = vm.registry_ref().unwrap();
    assert_ne!(a, b);
    assert_eq!(vm.top(), 0);
    vm.push_registry();
    vm.push(Val::Int(b));
    vm.raw_get_at(0).unwrap();
    assert_eq!(vm.value(1), Some(Val::Int(2)));
}

#[test]
fn test_next_walks_every_entry() {
    let vm = Machine::default();
    vm.create_table(0, 0);
    vm.push("a".into());
    vm.push("b".into());
    vm.set_list(2).unwrap();
    vm.push(Val::Nil);
    let mut seen = 0;
    while vm.next(0).unwrap() {
        seen += 1;
        vm.pop(1);
    }
    assert_eq!(seen, 2);
    assert_eq!(vm.top(), 1);
}

#[test]
fn test_stats_reset() {
    let vm = Machine::default();
    vm.create_table(0, 0);
    assert_eq!(vm.stats().snapshot().tables_created, 1);
    vm.stats().reset();
    assert_eq!(vm.stats().snapshot(), Default::default());
}
