use std::fmt;
use std::str::FromStr;

use crate::foundation::error::{TimewarpError, TimewarpResult};
use crate::tensor::FrameTensor;

/// Which spatial axis trades places with time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AxisPermutation {
    /// `(T,H,W,C) -> (W,H,T,C)`.
    SwapWithX,
    /// `(T,H,W,C) -> (H,T,W,C)`.
    SwapWithY,
}

impl AxisPermutation {
    /// Axis order handed to `permuted_axes`: output axis `i` is input axis `order[i]`.
    pub fn axis_order(self) -> [usize; 4] {
        match self {
            Self::SwapWithX => [2, 1, 0, 3],
            Self::SwapWithY => [1, 0, 2, 3],
        }
    }
}

impl FromStr for AxisPermutation {
    type Err = TimewarpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "x" => Ok(Self::SwapWithX),
            "y" => Ok(Self::SwapWithY),
            _ => Err(TimewarpError::invalid_axis(s)),
        }
    }
}

impl fmt::Display for AxisPermutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SwapWithX => "x",
            Self::SwapWithY => "y",
        })
    }
}

/// Reindex `tensor` into a fresh contiguous tensor. The input is left untouched.
pub fn permute(tensor: &FrameTensor, perm: AxisPermutation) -> FrameTensor {
    let permuted = tensor.as_array().view().permuted_axes(perm.axis_order());
    FrameTensor::from_array(permuted.as_standard_layout().into_owned())
}

/// Result of [`time_warp`]: the tensor to emit plus the rejection, if any.
#[derive(Debug)]
pub struct Warp {
    pub tensor: FrameTensor,
    pub rejected: Option<TimewarpError>,
}

impl Warp {
    pub fn into_result(self) -> (FrameTensor, TimewarpResult<()>) {
        match self.rejected {
            Some(e) => (self.tensor, Err(e)),
            None => (self.tensor, Ok(())),
        }
    }
}

/// Swap time with the spatial axis named by `axis` (`x`/`y`, any case).
///
/// An unknown axis hands the input back unchanged with an `InvalidAxis` rejection.
pub fn time_warp(tensor: FrameTensor, axis: &str) -> Warp {
    match axis.parse::<AxisPermutation>() {
        Ok(perm) => {
            let out = permute(&tensor, perm);
            tracing::info!(axis = %perm, from = ?tensor.shape(), to = ?out.shape(), "warped time");
            Warp {
                tensor: out,
                rejected: None,
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "leaving tensor unchanged");
            Warp {
                tensor,
                rejected: Some(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use ndarray::Array4;

    use super::*;

    fn ramp(t: usize, h: usize, w: usize) -> FrameTensor {
        FrameTensor::from_array(Array4::from_shape_fn((t, h, w, 3), |(t, h, w, c)| {
            (t * 31 + h * 7 + w * 3 + c) as u8
        }))
    }

    #[test]
    fn swap_with_x_moves_width_into_time() {
        let input = ramp(5, 3, 4);
        let out = permute(&input, AxisPermutation::SwapWithX);
        assert_eq!(out.shape(), (4, 3, 5, 3));
        let (a, b) = (input.as_array(), out.as_array());
        for t in 0..5 {
            for h in 0..3 {
                for w in 0..4 {
                    for c in 0..3 {
                        assert_eq!(b[[w, h, t, c]], a[[t, h, w, c]]);
                    }
                }
            }
        }
    }

    #[test]
    fn swap_with_y_moves_height_into_time() {
        let input = ramp(5, 3, 4);
        let out = permute(&input, AxisPermutation::SwapWithY);
        assert_eq!(out.shape(), (3, 5, 4, 3));
        let (a, b) = (input.as_array(), out.as_array());
        for t in 0..5 {
            for h in 0..3 {
                for w in 0..4 {
                    for c in 0..3 {
                        assert_eq!(b[[h, t, w, c]], a[[t, h, w, c]]);
                    }
                }
            }
        }
    }

    #[test]
    fn output_is_contiguous_and_input_untouched() {
        let input = ramp(2, 2, 6);
        let before = input.clone();
        let out = permute(&input, AxisPermutation::SwapWithX);
        assert!(out.as_array().is_standard_layout());
        assert_eq!(input, before);
    }

    #[test]
    fn swap_with_x_twice_is_identity() {
        let input = ramp(6, 4, 2);
        let once = time_warp(input.clone(), "x").tensor;
        let twice = time_warp(once, "X").tensor;
        assert_eq!(twice, input);
    }

    #[test]
    fn ten_frame_4x4_warps_to_4_4_10() {
        let input = FrameTensor::from_array(Array4::zeros((10, 4, 4, 3)));
        let warp = time_warp(input, "x");
        assert!(warp.rejected.is_none());
        assert_eq!(warp.tensor.shape(), (4, 4, 10, 3));
    }

    #[test]
    fn unknown_axis_returns_input_unchanged() {
        let input = ramp(3, 2, 2);
        for axis in ["z", "", "xy", "t"] {
            let (tensor, res) = time_warp(input.clone(), axis).into_result();
            assert_eq!(tensor, input);
            assert_eq!(res.unwrap_err().kind(), crate::ErrorKind::InvalidAxis);
        }
    }

    #[test]
    fn axis_parse_is_case_insensitive() {
        assert_eq!(" X ".parse::<AxisPermutation>().unwrap(), AxisPermutation::SwapWithX);
        assert_eq!("y".parse::<AxisPermutation>().unwrap(), AxisPermutation::SwapWithY);
        assert_eq!("Y".parse::<AxisPermutation>().unwrap(), AxisPermutation::SwapWithY);
    }
}
