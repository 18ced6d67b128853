

/// Memory controller front end.
pub mod controller;


/// Hot/cold table placement.
pub mod hot_cold;



/// Near channel interleaving and device routing.
pub mod ports;
