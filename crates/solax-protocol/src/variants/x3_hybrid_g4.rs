use types::Unit;

use crate::schema::WireSchema;
use crate::transforms::{
    discharge_energy, div10, div100, eps_total_energy, to_signed, twoway_div10, twoway_div100,
};
use crate::variant::{SensorDescriptor as S, VariantDefinition};

pub static X3_HYBRID_G4: VariantDefinition = VariantDefinition {
    name: "X3HybridG4",
    description: "X3 Hybrid G4 (firmware v3.003.02)",
    schema: WireSchema {
        discriminant: 14,
        data_len: 200,
        information_len: 10,
    },
    sensors: SENSORS,
};

// Not exposed: total energy (19), its resets (20), today's energy (21) and the
// feed-in and consumption resets counters.
const SENSORS: &[S] = &[
    S::scaled("Network Voltage Phase 1", 0, Unit::Volt, div10),
    S::scaled("Network Voltage Phase 2", 1, Unit::Volt, div10),
    S::scaled("Network Voltage Phase 3", 2, Unit::Volt, div10),
    S::scaled("Output Current Phase 1", 3, Unit::Ampere, twoway_div10),
    S::scaled("Output Current Phase 2", 4, Unit::Ampere, twoway_div10),
    S::scaled("Output Current Phase 3", 5, Unit::Ampere, twoway_div10),
    S::scaled("Power Now Phase 1", 6, Unit::Watt, to_signed),
    S::scaled("Power Now Phase 2", 7, Unit::Watt, to_signed),
    S::scaled("Power Now Phase 3", 8, Unit::Watt, to_signed),
    S::scaled("AC Power", 9, Unit::Watt, to_signed),
    S::scaled("PV1 Voltage", 10, Unit::Volt, div10),
    S::scaled("PV2 Voltage", 11, Unit::Volt, div10),
    S::scaled("PV1 Current", 12, Unit::Ampere, div10),
    S::scaled("PV2 Current", 13, Unit::Ampere, div10),
    S::raw("PV1 Power", 14, Unit::Watt),
    S::raw("PV2 Power", 15, Unit::Watt),
    S::scaled("Grid Frequency Phase 1", 16, Unit::Hertz, div100),
    S::scaled("Grid Frequency Phase 2", 17, Unit::Hertz, div100),
    S::scaled("Grid Frequency Phase 3", 18, Unit::Hertz, div100),
    S::scaled("Battery Voltage", 24, Unit::Volt, div100),
    S::scaled("Battery Current", 25, Unit::Ampere, twoway_div100),
    S::scaled("Battery Power", 26, Unit::Watt, to_signed),
    S::raw("Battery Temperature", 27, Unit::Celsius),
    S::raw("Battery Remaining Capacity", 28, Unit::Percent),
    S::with_resets("Total Battery Discharge Energy", 30, 31, Unit::KilowattHour, discharge_energy),
    S::raw("Total Battery Discharge Energy Resets", 31, Unit::None),
    S::scaled("Battery Remaining Energy", 32, Unit::KilowattHour, div10),
    S::scaled("EPS Frequency", 63, Unit::Hertz, div100),
    S::scaled("Exported Power", 65, Unit::Watt, to_signed),
    S::scaled("Total PV Energy", 68, Unit::KilowattHour, div10),
    S::scaled("Today's PV Energy", 70, Unit::KilowattHour, div10),
    S::scaled("Total Battery Charge Energy", 87, Unit::KilowattHour, div10),
    S::scaled("Total Feed-in Energy", 86, Unit::KilowattHour, div100),
    S::scaled("Total Consumption", 88, Unit::KilowattHour, div10),
    S::raw("Total PV Energy Resets", 90, Unit::None),
    S::with_resets("EPS Total Energy", 110, 111, Unit::KilowattHour, eps_total_energy),
    S::raw("EPS Total Energy Resets", 111, Unit::None),
    S::scaled("Today's Battery Discharge Energy", 113, Unit::KilowattHour, div10),
    S::scaled("Today's Battery Charge Energy", 114, Unit::KilowattHour, div10),
];
