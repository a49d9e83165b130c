//! Highway layers: `T(x) * H(x) + (1 - T(x)) * x`

use candle_core::Tensor;
use candle_nn::{Init, Linear, Module, VarBuilder};

use crate::error::Result;

/// Initial transform-gate bias, favouring the carry path early in training
const GATE_BIAS_INIT: f64 = -1.0;

/// One highway layer of constant width
pub struct Highway {
    transform: Linear,
    gate: Linear,
}

impl Highway {
    /// Create a highway layer of width `units`
    pub fn new(units: usize, vb: VarBuilder) -> Result<Self> {
        let transform = candle_nn::linear(units, units, vb.pp("H"))?;

        let gate_vb = vb.pp("T");
        let weight = gate_vb.get_with_hints(
            (units, units),
            "weight",
            candle_nn::init::DEFAULT_KAIMING_NORMAL,
        )?;
        let bias = gate_vb.get_with_hints(units, "bias", Init::Const(GATE_BIAS_INIT))?;
        let gate = Linear::new(weight, Some(bias));

        Ok(Self { transform, gate })
    }

    /// x: (..., units) -> (..., units)
    pub fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let h = self.transform.forward(x)?.relu()?;
        let t = candle_nn::ops::sigmoid(&self.gate.forward(x)?)?;
        let carry = t.affine(-1.0, 1.0)?;
        Ok(h.mul(&t)?.add(&x.mul(&carry)?)?)
    }
}
