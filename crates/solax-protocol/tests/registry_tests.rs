use solax_protocol::transforms::{discharge_energy, div10};
use solax_protocol::{
    DefinitionError, Registry, SensorDescriptor, VariantDefinition, WireSchema, X3_HYBRID_G4,
};
use types::Unit;

const SCHEMA: WireSchema = WireSchema {
    discriminant: 99,
    data_len: 10,
    information_len: 2,
};

static OUT_OF_RANGE: VariantDefinition = VariantDefinition {
    name: "OutOfRange",
    description: "reads past the data array",
    schema: SCHEMA,
    sensors: &[SensorDescriptor::scaled("Voltage", 10, Unit::Volt, div10)],
};

static RESETS_OUT_OF_RANGE: VariantDefinition = VariantDefinition {
    name: "ResetsOutOfRange",
    description: "resets counter past the data array",
    schema: SCHEMA,
    sensors: &[SensorDescriptor::with_resets(
        "Energy",
        9,
        10,
        Unit::KilowattHour,
        discharge_energy,
    )],
};

static DUPLICATE: VariantDefinition = VariantDefinition {
    name: "Duplicate",
    description: "two sensors share a name",
    schema: SCHEMA,
    sensors: &[
        SensorDescriptor::raw("Power", 1, Unit::Watt),
        SensorDescriptor::raw("Power", 2, Unit::Watt),
    ],
};

static SMALL: VariantDefinition = VariantDefinition {
    name: "Small",
    description: "valid test layout",
    schema: SCHEMA,
    sensors: &[SensorDescriptor::raw("Power", 9, Unit::Watt)],
};

#[test]
fn builtin_variants_are_well_formed() {
    let registry = Registry::builtin().expect("builtin registry");
    assert!(!registry.is_empty());
    assert_eq!(registry.iter().next().map(|v| v.name), Some(X3_HYBRID_G4.name));
}

#[test]
fn register_rejects_bad_definitions() {
    let mut registry = Registry::new();
    assert_eq!(
        registry.register(&OUT_OF_RANGE).err(),
        Some(DefinitionError::IndexOutOfRange {
            variant: "OutOfRange",
            sensor: "Voltage",
            index: 10,
            len: 10,
        })
    );
    assert!(matches!(
        registry.register(&RESETS_OUT_OF_RANGE),
        Err(DefinitionError::IndexOutOfRange { index: 10, .. })
    ));
    assert!(matches!(
        registry.register(&DUPLICATE),
        Err(DefinitionError::DuplicateSensor { sensor: "Power", .. })
    ));
    assert!(registry.is_empty());
}

#[test]
fn registration_order_is_preserved() {
    let mut registry = Registry::new();
    registry
        .register(&SMALL)
        .expect("small")
        .register(&X3_HYBRID_G4)
        .expect("x3");

    let names: Vec<&str> = registry.iter().map(|variant| variant.name).collect();
    assert_eq!(names, ["Small", "X3HybridG4"]);
    assert_eq!(registry.len(), 2);
}
