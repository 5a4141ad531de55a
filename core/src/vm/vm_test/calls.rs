use super::*;

#[test]
fn test_call_keeps_every_result_on_multret() {
    let vm = Machine::default();
    vm.push(Val::Int(0));
    push_echo(&vm);
    vm.push(Val::Int(1));
    vm.push(Val::Int(2));
    let n = vm.call(2, None).unwrap();
    assert_eq!(n, 2);
    assert_eq!(vm.top(), 3);
    assert_eq!(vm.value(1), Some(Val::Int(1)));
    assert_eq!(vm.value(2), Some(Val::Int(2)));
    assert_eq!(vm.call_depth(), 0);
}

#[test]
fn test_call_adjusts_to_fixed_result_count() {
    let vm = Machine::default();
    push_echo(&vm);
    vm.push(Val::Int(1));
    assert_eq!(vm.call(1, Some(3)).unwrap(), 3);
    assert_eq!(vm.top(), 3);
    assert_eq!(vm.value(2), Some(Val::Nil));

    push_echo(&vm);
    vm.push(Val::Int(4));
    vm.push(Val::Int(5));
    assert_eq!(vm.call(2, Some(1)).unwrap(), 1);
    assert_eq!(vm.top(), 4);
    assert_eq!(vm.value(3), Some(Val::Int(4)));
}

#[test]
fn test_calling_a_non_function_consumes_operands() {
    let vm = Machine::default();
    vm.push(Val::Bool(true));
    vm.push(Val::Int(3));
    vm.push(Val::Int(1));
    let err = vm.call(1, None).unwrap_err();
    assert_eq!(err.to_string(), "attempt to call a number value");
    assert_eq!(vm.top(), 1);
}

#[test]
fn test_native_error_restores_stack() {
    let vm = Machine::default();
    vm.push(Val::Int(9));
    push_failing(&vm, "boom");
    vm.push(Val::Int(1));
    let err = vm.call(1, Some(1)).unwrap_err();
    assert_eq!(err, Error::runtime("boom"));
    assert_eq!(vm.top(), 1);
    assert_eq!(vm.call_depth(), 0);
}

#[test]
fn test_pcall_reports_failure_as_value() {
    let vm = Machine::default();
    push_failing(&vm, "boom");
    let (ok, n) = vm.pcall(0, Some(2));
    assert!(!ok);
    assert_eq!(n, 2);
    assert_eq!(vm.value(0), Some(Val::from("boom")));
    assert_eq!(vm.value(1), Some(Val::Nil));

    push_echo(&vm);
    vm.push(Val::Int(1));
    let (ok, n) = vm.pcall(1, None);
    assert!(ok);
    assert_eq!(n, 1);
    assert_eq!(vm.top(), 3);
    assert_eq!(vm.stats().count(Primitive::PCall), 2);
}

#[test]
fn test_call_metamethod_receives_callee_first() {
    let vm = Machine::default();
    vm.create_table(0, 0);
    vm.duplicate(0);
    vm.create_table(0, 0);
    vm.push("__call".into());
    push_echo(&vm);
    vm.raw_set_at(2).unwrap();
    vm.set_metatable().unwrap();

    vm.duplicate(0);
    vm.push(Val::Int(5));
    let n = vm.call(1, None).unwrap();
    assert_eq!(n, 2);
    assert!(vm.raw_equal(0, 1));
    assert_eq!(vm.value(2), Some(Val::Int(5)));
}

#[test]
fn test_frame_base_points_at_first_argument() {
    let vm = Machine::default();
    vm.push(Val::Nil);
    let probe: RawFn = Rc::new(|vm: &Machine| {
        vm.push(Val::from(vm.frame_base() as i64));
        vm.push(Val::from(vm.call_depth() as i64));
        Ok(2)
    });
    vm.push_closure(probe, 0);
    vm.push(Val::Int(1));
    vm.call(1, None).unwrap();
    assert_eq!(vm.value(1), Some(Val::Int(1)));
    assert_eq!(vm.value(2), Some(Val::Int(1)));
    assert_eq!(vm.top(), 3);
}

#[test]
fn test_runaway_recursion_overflows() {
    let vm = Machine::new(StateConfig {
        max_call_depth: 5,
        ..StateConfig::default()
    });
    let recurse: RawFn = Rc::new(|vm: &Machine| {
        let me = vm.globals().borrow().get_str("f");
        vm.push(me);
        vm.call(0, Some(0))?;
        Ok(0)
    });
    vm.push_closure(recurse, 0);
    vm.push_globals();
    vm.push("f".into());
    vm.duplicate(0);
    vm.raw_set_at(1).unwrap();
    vm.pop(1);

    let err = vm.call(0, None).unwrap_err();
    assert_eq!(err.to_string(), "stack overflow");
    assert_eq!(vm.top(), 0);
    assert_eq!(vm.call_depth(), 0);
}
