#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|schema_and_instance: (Vec<u8>, Vec<u8>)| {
    let (schema, instance) = schema_and_instance;

    let schema = match serde_json::from_slice::<serde_json::Value>(&schema) {
        Ok(value) => value,
        Err(_) => return,
    };

    // We're only interested in fuzzing against valid schemas.
    let schema = match jsonv::Schema::from_value(&schema) {
        Ok(schema) => schema,
        Err(_) => return,
    };

    if let Ok(instance) = serde_json::from_slice::<serde_json::Value>(&instance) {
        let _ = jsonv::validate(&schema, &instance, jsonv::ValidateOptions::new());
    }
});
