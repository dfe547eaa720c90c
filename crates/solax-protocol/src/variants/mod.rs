mod x3_hybrid_g4;

pub use x3_hybrid_g4::X3_HYBRID_G4;
