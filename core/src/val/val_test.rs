use anyhow::Result;

use crate::val::{TableData, Val, ValueType, format_float, to_integer, to_number};

#[test]
fn test_type_names() {
    assert_eq!(Val::Nil.type_of(), ValueType::Nil);
    assert_eq!(Val::Int(1).type_of().name(), "number");
    assert_eq!(Val::Number(1.5).type_of().name(), "number");
    assert_eq!(Val::from("x").type_of().name(), "string");
    assert_eq!(Val::new_table().type_of(), ValueType::Table);
    assert_eq!(ValueType::None.to_string(), "no value");
}

#[test]
fn test_truthiness() {
    assert!(!Val::Nil.truthy());
    assert!(!Val::Bool(false).truthy());
    assert!(Val::Int(0).truthy());
    assert!(Val::from("").truthy());
}

#[test]
fn test_raw_eq_mixes_int_and_float() {
    assert_eq!(Val::Int(3), Val::Number(3.0));
    assert_ne!(Val::Int(3), Val::from("3"));
    let t = Val::new_table();
    assert_eq!(t, t.clone());
    assert_ne!(t, Val::new_table());
}

#[test]
fn test_number_coercion() {
    assert_eq!(to_number(&Val::from(" 42 ")), Some(Val::Int(42)));
    assert_eq!(to_number(&Val::from("0x10")), Some(Val::Int(16)));
    assert_eq!(to_number(&Val::from("2.5")), Some(Val::Number(2.5)));
    assert_eq!(to_number(&Val::from("inf")), None);
    assert_eq!(to_number(&Val::from("abc")), None);
    assert_eq!(to_integer(&Val::Number(4.0)), Some(4));
    assert_eq!(to_integer(&Val::Number(4.5)), None);
}

#[test]
fn test_float_formatting() {
    assert_eq!(format_float(2.0), "2.0");
    assert_eq!(format_float(0.5), "0.5");
    assert_eq!(format_float(f64::INFINITY), "inf");
    assert_eq!(Val::Number(-3.0).to_string(), "-3.0");
    assert_eq!(Val::Int(-3).to_string(), "-3");
}

#[test]
fn test_table_array_and_hash_parts() -> Result<()> {
    let t = TableData::new_ref(0, 0);
    let mut data = t.borrow_mut();
    data.set(Val::Int(2), Val::from("b"))?;
    assert_eq!(data.len(), 0);
    data.set(Val::Int(1), Val::from("a"))?;
    assert_eq!(data.len(), 2);
    data.set(Val::Number(3.0), Val::from("c"))?;
    assert_eq!(data.get(&Val::Int(3)), Val::from("c"));
    assert_eq!(data.len(), 3);
    data.set(Val::Int(3), Val::Nil)?;
    assert_eq!(data.len(), 2);
    data.set(Val::from("k"), Val::Bool(true))?;
    assert_eq!(data.get_str("k"), Val::Bool(true));
    Ok(())
}

#[test]
fn test_table_rejects_nil_and_nan_keys() {
    let t = TableData::new_ref(0, 0);
    let err = t.borrow_mut().set(Val::Nil, Val::Int(1)).unwrap_err();
    assert_eq!(err.to_string(), "table index is nil");
    let err = t.borrow_mut().set(Val::Number(f64::NAN), Val::Int(1)).unwrap_err();
    assert_eq!(err.to_string(), "table index is NaN");
}

#[test]
fn test_table_next_visits_every_entry_once() -> Result<()> {
    let t = TableData::new_ref(0, 0);
    {
        let mut data = t.borrow_mut();
        data.set(Val::Int(1), Val::Int(10))?;
        data.set(Val::Int(2), Val::Int(20))?;
        data.set(Val::from("x"), Val::Int(30))?;
        data.set(Val::from("y"), Val::Int(40))?;
        data.set(Val::from("x"), Val::Nil)?;
    }
    let data = t.borrow();
    let mut key = Val::Nil;
    let mut seen = Vec::new();
    while let Some((k, v)) = data.next(&key)? {
        seen.push(v.clone());
        key = k;
    }
    assert_eq!(seen, vec![Val::Int(10), Val::Int(20), Val::Int(40)]);
    assert!(data.next(&Val::from("missing")).is_err());
    Ok(())
}

#[test]
fn test_table_reuses_space_of_deleted_keys() -> Result<()> {
    let t = TableData::new_ref(0, 0);
    let mut data = t.borrow_mut();
    data.set(Val::from("keep"), Val::Int(1))?;
    for i in 0..10_000 {
        let key = Val::from(format!("k{i}").as_str());
        data.set(key.clone(), Val::Int(i))?;
        data.set(key, Val::Nil)?;
    }
    assert!(data.hash_slots() <= 4);
    assert_eq!(data.get_str("keep"), Val::Int(1));
    assert!(!data.is_empty());
    data.set(Val::from("keep"), Val::Nil)?;
    assert!(data.is_empty());
    Ok(())
}

#[test]
fn test_table_next_survives_clearing_visited_keys() -> Result<()> {
    let t = TableData::new_ref(0, 0);
    let mut data = t.borrow_mut();
    for name in ["a", "b", "c", "d"] {
        data.set(Val::from(name), Val::from(name))?;
    }
    let mut key = Val::Nil;
    let mut seen = 0;
    while let Some((k, _)) = data.next(&key)? {
        data.set(k.clone(), Val::Nil)?;
        key = k;
        seen += 1;
    }
    assert_eq!(seen, 4);
    assert!(data.is_empty());
    data.set(Val::from("e"), Val::Int(5))?;
    assert_eq!(data.hash_slots(), 1);
    Ok(())
}
