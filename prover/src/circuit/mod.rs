pub mod merkle;
pub mod mimc;
pub mod withdraw;

pub use merkle::{bits_to_num, fold_path};
pub use mimc::MiMCGadget;
pub use withdraw::{NUM_PUBLIC_INPUTS, WithdrawCircuit};
