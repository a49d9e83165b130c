//! Building blocks shared by the encoder and the post-processing net

mod cbhg;
mod conv;
mod conv_bank;
mod highway;
mod prenet;
mod rnn;

pub use cbhg::{max_pool_same, Cbhg};
pub use conv::{BatchNormConv1d, Conv1dSame};
pub use conv_bank::ConvBank;
pub use highway::Highway;
pub use prenet::Prenet;
pub use rnn::{reverse_time, BiGru};
