mod ik;
mod morph;
mod skeleton;

pub use ik::*;
pub use morph::*;
pub use skeleton::*;


#[cfg(test)]
mod ik_tests;
