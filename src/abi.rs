//! Purpose: C ABI bridge for simulators written in other languages (libkim_collections).
//! Exports: C-callable collections/simulator-model/unit functions and buffer/error helpers.
//! Role: Stable ABI surface over `api`.
//! Invariants: UTF-8 strings in; bytes or JSON out; opaque handles; explicit free functions.
//! Invariants: Every call returns 0 on success or -1 with `*out_err` populated.
//! Invariants: Error kinds map 1:1 with `to_exit_code`.
#![allow(non_camel_case_types)]

use crate::api::{
    ChargeUnit, Collections, EnergyUnit, Error, ErrorKind, Extensible, LengthUnit, SimulatorModel,
    TemperatureUnit, TimeUnit, UnitExponents, UnitSystem, convert_unit, to_exit_code,
};
use crate::core::names::CollectionItemType;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

#[repr(C)]
pub struct kim_collections {
    collections: Collections,
}

#[repr(C)]
pub struct kim_simulator_model {
    model: SimulatorModel,
}

#[repr(C)]
pub struct kim_buf {
    data: *mut u8,
    len: usize,
}

#[repr(C)]
pub struct kim_error {
    kind: i32,
    message: *mut c_char,
    path: *mut c_char,
    item: *mut c_char,
}

#[unsafe(no_mangle)]
pub extern "C" fn kim_collections_create(
    out_collections: *mut *mut kim_collections,
    out_err: *mut *mut kim_error,
) -> i32 {
    if out_collections.is_null() {
        return fail(out_err, usage("out_collections is null"));
    }
    let handle = Box::new(kim_collections {
        collections: Collections::from_process(),
    });
    unsafe {
        *out_collections = Box::into_raw(handle);
    }
    0
}

#[unsafe(no_mangle)]
pub extern "C" fn kim_collections_free(collections: *mut kim_collections) {
    if collections.is_null() {
        return;
    }
    unsafe {
        drop(Box::from_raw(collections));
    }
}

/// Writes `{"library_path": ..., "collection": ...}` for the first match.
#[unsafe(no_mangle)]
pub extern "C" fn kim_collections_item_library_file_name(
    collections: *mut kim_collections,
    item_type: *const c_char,
    item_name: *const c_char,
    out_json: *mut kim_buf,
    out_err: *mut *mut kim_error,
) -> i32 {
    let collections = match borrow(collections, "collections", out_err) {
        Ok(collections) => collections,
        Err(code) => return code,
    };
    let item_type = match parse_item_type(item_type) {
        Ok(item_type) => item_type,
        Err(err) => return fail(out_err, err),
    };
    let item_name = match read_str(item_name, "item_name") {
        Ok(name) => name,
        Err(err) => return fail(out_err, err),
    };
    let resolved = match collections
        .collections
        .item_library_file_name_and_collection(item_type, item_name)
    {
        Ok(resolved) => resolved,
        Err(err) => return fail(out_err, err),
    };
    let json = serde_json::json!({
        "library_path": resolved.library_path.to_string_lossy(),
        "collection": resolved.collection.to_string(),
    });
    match write_json_buf(out_json, &json) {
        Ok(()) => 0,
        Err(err) => fail(out_err, err),
    }
}

/// Writes the sorted item names of `item_type` as a JSON array of strings.
#[unsafe(no_mangle)]
pub extern "C" fn kim_collections_item_names_by_type(
    collections: *mut kim_collections,
    item_type: *const c_char,
    out_json: *mut kim_buf,
    out_err: *mut *mut kim_error,
) -> i32 {
    let collections = match borrow(collections, "collections", out_err) {
        Ok(collections) => collections,
        Err(code) => return code,
    };
    let item_type = match parse_item_type(item_type) {
        Ok(item_type) => item_type,
        Err(err) => return fail(out_err, err),
    };
    let names = match item_names(&mut collections.collections, item_type) {
        Ok(names) => names,
        Err(err) => return fail(out_err, err),
    };
    match write_json_buf(out_json, &serde_json::Value::from(names)) {
        Ok(()) => 0,
        Err(err) => fail(out_err, err),
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn kim_simulator_model_create(
    name: *const c_char,
    out_model: *mut *mut kim_simulator_model,
    out_err: *mut *mut kim_error,
) -> i32 {
    if out_model.is_null() {
        return fail(out_err, usage("out_model is null"));
    }
    let name = match read_str(name, "name") {
        Ok(name) => name,
        Err(err) => return fail(out_err, err),
    };
    let model = match SimulatorModel::create_from_process(name) {
        Ok(model) => model,
        Err(err) => return fail(out_err, err),
    };
    let handle = Box::new(kim_simulator_model { model });
    unsafe {
        *out_model = Box::into_raw(handle);
    }
    0
}

#[unsafe(no_mangle)]
pub extern "C" fn kim_simulator_model_free(model: *mut kim_simulator_model) {
    if model.is_null() {
        return;
    }
    unsafe {
        drop(Box::from_raw(model));
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn kim_simulator_model_open_template_map(
    model: *mut kim_simulator_model,
    out_err: *mut *mut kim_error,
) -> i32 {
    match borrow(model, "model", out_err) {
        Ok(model) => {
            model.model.open_and_initialize_template_map();
            0
        }
        Err(code) => code,
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn kim_simulator_model_add_template_map(
    model: *mut kim_simulator_model,
    key: *const c_char,
    value: *const c_char,
    out_err: *mut *mut kim_error,
) -> i32 {
    let model = match borrow(model, "model", out_err) {
        Ok(model) => model,
        Err(code) => return code,
    };
    let pair = read_str(key, "key").and_then(|key| Ok((key, read_str(value, "value")?)));
    let (key, value) = match pair {
        Ok(pair) => pair,
        Err(err) => return fail(out_err, err),
    };
    match model.model.add_template_map(key, value) {
        Ok(()) => 0,
        Err(err) => fail(out_err, err),
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn kim_simulator_model_close_template_map(
    model: *mut kim_simulator_model,
    out_err: *mut *mut kim_error,
) -> i32 {
    match borrow(model, "model", out_err) {
        Ok(model) => {
            model.model.close_template_map();
            0
        }
        Err(code) => code,
    }
}

/// Copies one substituted field line (no trailing NUL) into `out_line`.
#[unsafe(no_mangle)]
pub extern "C" fn kim_simulator_model_simulator_field_line(
    model: *mut kim_simulator_model,
    field_index: usize,
    line_index: usize,
    out_line: *mut kim_buf,
    out_err: *mut *mut kim_error,
) -> i32 {
    let model = match borrow(model, "model", out_err) {
        Ok(model) => model,
        Err(code) => return code,
    };
    let line = match model.model.simulator_field_line(field_index, line_index) {
        Ok(line) => line.as_bytes().to_vec(),
        Err(err) => return fail(out_err, err),
    };
    match write_buf(out_line, line) {
        Ok(()) => 0,
        Err(err) => fail(out_err, err),
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn kim_simulator_model_summary_json(
    model: *mut kim_simulator_model,
    out_json: *mut kim_buf,
    out_err: *mut *mut kim_error,
) -> i32 {
    let model = match borrow(model, "model", out_err) {
        Ok(model) => model,
        Err(code) => return code,
    };
    match write_json_buf(out_json, &model.model.summary_json()) {
        Ok(()) => 0,
        Err(err) => fail(out_err, err),
    }
}

/// `from_units`/`to_units` point at five unit names (length, energy, charge,
/// temperature, time); `exponents` points at five doubles in the same order.
#[unsafe(no_mangle)]
pub extern "C" fn kim_convert_unit(
    from_units: *const *const c_char,
    to_units: *const *const c_char,
    exponents: *const f64,
    out_factor: *mut f64,
    out_err: *mut *mut kim_error,
) -> i32 {
    if out_factor.is_null() {
        return fail(out_err, usage("out_factor is null"));
    }
    if exponents.is_null() {
        return fail(out_err, usage("exponents is null"));
    }
    let systems = parse_unit_system(from_units, "from_units")
        .and_then(|from| Ok((from, parse_unit_system(to_units, "to_units")?)));
    let (from, to) = match systems {
        Ok(systems) => systems,
        Err(err) => return fail(out_err, err),
    };
    let values = unsafe { std::slice::from_raw_parts(exponents, 5) };
    let exponents = UnitExponents::new(values[0], values[1], values[2], values[3], values[4]);
    match convert_unit(&from, &to, exponents) {
        Ok(factor) => {
            unsafe {
                *out_factor = factor;
            }
            0
        }
        Err(err) => fail(out_err, err),
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn kim_buf_free(buf: *mut kim_buf) {
    if buf.is_null() {
        return;
    }
    unsafe {
        let buf = &mut *buf;
        if !buf.data.is_null() && buf.len != 0 {
            drop(Vec::from_raw_parts(buf.data, buf.len, buf.len));
        }
        buf.data = ptr::null_mut();
        buf.len = 0;
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn kim_error_free(err: *mut kim_error) {
    if err.is_null() {
        return;
    }
    unsafe {
        let err = Box::from_raw(err);
        for text in [err.message, err.path, err.item] {
            if !text.is_null() {
                drop(CString::from_raw(text));
            }
        }
    }
}

fn item_names(
    collections: &mut Collections,
    item_type: CollectionItemType,
) -> Result<Vec<String>, Error> {
    let count = collections.cache_list_of_item_names_by_type(item_type)?;
    (0..count)
        .map(|index| collections.item_name_by_type(index).map(str::to_string))
        .collect()
}

fn borrow<'a, T>(handle: *mut T, what: &str, out_err: *mut *mut kim_error) -> Result<&'a mut T, i32> {
    if handle.is_null() {
        return Err(fail(out_err, usage(&format!("{what} is null"))));
    }
    unsafe { Ok(&mut *handle) }
}

fn read_str<'a>(input: *const c_char, what: &str) -> Result<&'a str, Error> {
    if input.is_null() {
        return Err(usage(&format!("{what} is null")));
    }
    unsafe { CStr::from_ptr(input) }
        .to_str()
        .map_err(|_| usage(&format!("{what} is not valid UTF-8")))
}

fn parse_item_type(input: *const c_char) -> Result<CollectionItemType, Error> {
    Extensible::<CollectionItemType>::from_name(read_str(input, "item_type")?).require_known()
}

fn parse_unit_system(names: *const *const c_char, what: &str) -> Result<UnitSystem, Error> {
    if names.is_null() {
        return Err(usage(&format!("{what} is null")));
    }
    let names = unsafe { std::slice::from_raw_parts(names, 5) };
    Ok(UnitSystem::new(
        Extensible::<LengthUnit>::from_name(read_str(names[0], what)?),
        Extensible::<EnergyUnit>::from_name(read_str(names[1], what)?),
        Extensible::<ChargeUnit>::from_name(read_str(names[2], what)?),
        Extensible::<TemperatureUnit>::from_name(read_str(names[3], what)?),
        Extensible::<TimeUnit>::from_name(read_str(names[4], what)?),
    ))
}

fn write_json_buf(out: *mut kim_buf, value: &serde_json::Value) -> Result<(), Error> {
    let bytes = serde_json::to_vec(value).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("failed to serialize json")
            .with_source(err)
    })?;
    write_buf(out, bytes)
}

fn write_buf(out: *mut kim_buf, bytes: Vec<u8>) -> Result<(), Error> {
    if out.is_null() {
        return Err(usage("output buffer is null"));
    }
    unsafe {
        let buf = &mut *out;
        let mut data = bytes.into_boxed_slice();
        buf.len = data.len();
        buf.data = data.as_mut_ptr();
        std::mem::forget(data);
    }
    Ok(())
}

fn usage(message: &str) -> Error {
    Error::new(ErrorKind::Usage).with_message(message.to_string())
}

fn fail(out_err: *mut *mut kim_error, err: Error) -> i32 {
    if out_err.is_null() {
        return -1;
    }
    let error = Box::new(kim_error {
        kind: to_exit_code(err.kind()),
        message: to_c_string(err.message().unwrap_or("")),
        path: err
            .path()
            .map(|path| to_c_string(path.to_string_lossy().as_ref()))
            .unwrap_or(ptr::null_mut()),
        item: err.item().map(to_c_string).unwrap_or(ptr::null_mut()),
    });
    unsafe {
        *out_err = Box::into_raw(error);
    }
    -1
}

fn to_c_string(input: &str) -> *mut c_char {
    CString::new(input)
        .map(|s| s.into_raw())
        .unwrap_or(ptr::null_mut())
}

#[cfg(test)]
mod tests {
    use super::{kim_buf, kim_buf_free, kim_convert_unit, kim_error, kim_error_free};
    use std::ptr;

    #[test]
    fn convert_unit_reports_factor_and_errors() {
        let metal = [c"A".as_ptr(), c"eV".as_ptr(), c"e".as_ptr(), c"K".as_ptr(), c"ps".as_ptr()];
        let real = [
            c"A".as_ptr(),
            c"kcal_mol".as_ptr(),
            c"e".as_ptr(),
            c"K".as_ptr(),
            c"fs".as_ptr(),
        ];
        let energy = [0.0, 1.0, 0.0, 0.0, 0.0];
        let mut factor = 0.0;
        let mut err: *mut kim_error = ptr::null_mut();
        let rc = kim_convert_unit(metal.as_ptr(), real.as_ptr(), energy.as_ptr(), &mut factor, &mut err);
        assert_eq!(rc, 0);
        assert!((factor - 23.060_548).abs() < 1e-4);

        let unused = [
            c"A".as_ptr(),
            c"eV".as_ptr(),
            c"unused".as_ptr(),
            c"K".as_ptr(),
            c"ps".as_ptr(),
        ];
        let charge = [0.0, 0.0, 1.0, 0.0, 0.0];
        let rc = kim_convert_unit(unused.as_ptr(), real.as_ptr(), charge.as_ptr(), &mut factor, &mut err);
        assert_eq!(rc, -1);
        assert!(!err.is_null());
        assert_eq!(unsafe { (*err).kind }, 5);
        kim_error_free(err);
    }

    #[test]
    fn buf_free_resets_the_buffer() {
        let mut buf = kim_buf {
            data: ptr::null_mut(),
            len: 0,
        };
        super::write_buf(&mut buf, b"abc".to_vec()).expect("write");
        assert_eq!(buf.len, 3);
        kim_buf_free(&mut buf);
        assert!(buf.data.is_null());
        assert_eq!(buf.len, 0);
    }
}
