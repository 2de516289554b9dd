use hanoi_asm::FaultReason;
use hanoi_ternary::T81Big;

use itertools::Itertools;

use core::f64::consts::TAU;

use crate::{
    consts::PHASE_QUANTA,
    error::SimpleResult,
    operand::{Matrix, Operand, Tensor, Vector},
    state::ExecuteState,
    symbolic::T729HoloTensor,
};

use super::Interpreter;

impl Interpreter {
    /// Element-wise saturating accumulate of the two immediates.
    ///
    /// Saturation clamps at the current tier's maximum magnitude; a raw sum
    /// reaching the tier base is reported to the FSM as a promotion
    /// observation even when the stored value was clamped.
    pub(crate) fn op_tnn_accum(&mut self, operands: &[Operand]) -> SimpleResult<ExecuteState> {
        let boundary = u64::from(self.tier.base()) - 1;
        match (operands.first(), operands.get(1)) {
            (Some(Operand::Vector(a)), Some(Operand::Vector(b))) => {
                if a.len() != b.len() {
                    return Err(FaultReason::TypeMismatch)
                }
                let (cells, raw) =
                    saturating_accum(a.elements(), b.elements(), boundary)?;
                self.note_magnitude(raw);
                let vector = Vector::new(cells)
                    .map_err(|_| FaultReason::MalformedOperand)?;
                self.push_operand(Operand::Vector(vector))?;
                Ok(ExecuteState::Proceed)
            }
            (Some(Operand::Matrix(a)), Some(Operand::Matrix(b))) => {
                if a.rows() != b.rows() || a.cols() != b.cols() {
                    return Err(FaultReason::TypeMismatch)
                }
                let (cells, raw) = saturating_accum(a.cells(), b.cells(), boundary)?;
                self.note_magnitude(raw);
                let matrix = Matrix::new(a.rows(), a.cols(), cells)
                    .map_err(|_| FaultReason::MalformedOperand)?;
                self.push_operand(Operand::Matrix(matrix))?;
                Ok(ExecuteState::Proceed)
            }
            _ => Err(FaultReason::TypeMismatch),
        }
    }

    /// Product of the two immediate matrices, `C[i][j] = Σ A[i][p]·B[p][j]`.
    pub(crate) fn op_t81_matmul(&mut self, operands: &[Operand]) -> SimpleResult<ExecuteState> {
        let (Some(Operand::Matrix(a)), Some(Operand::Matrix(b))) =
            (operands.first(), operands.get(1))
        else {
            return Err(FaultReason::TypeMismatch)
        };
        if a.cols() != b.rows() {
            return Err(FaultReason::TypeMismatch)
        }
        let mut cells = Vec::with_capacity(usize::from(a.rows()) * usize::from(b.cols()));
        for (i, j) in (0..a.rows()).cartesian_product(0..b.cols()) {
            let mut acc = T81Big::zero();
            for p in 0..a.cols() {
                let x = cell_int(a, i, p)?;
                let y = cell_int(b, p, j)?;
                acc = acc.add(&x.mul(y));
            }
            cells.push(Operand::BigInt(acc));
        }
        let product = Matrix::new(a.rows(), b.cols(), cells)
            .map_err(|_| FaultReason::MalformedOperand)?;
        self.push_operand(Operand::Matrix(product))?;
        Ok(ExecuteState::Proceed)
    }

    /// Radix-3 Cooley–Tukey transform over the holotensor popped from the
    /// stack (imaginary part on top of the real part).
    ///
    /// Pushes the transformed real and imaginary tensors followed by the
    /// phase vector, `atan2(im, re)` quantized to 2π/729.
    pub(crate) fn op_t729_holo_fft(&mut self, _operands: &[Operand]) -> SimpleResult<ExecuteState> {
        let imag = self.pop_operand()?;
        let real = match self.pop_operand() {
            Ok(real) => real,
            Err(reason) => {
                self.restore([imag]);
                return Err(reason)
            }
        };

        let outcome = holo_fft(&real, &imag);
        match outcome {
            Ok((real_out, imag_out, phase)) => {
                // three pushes; unwind back to the popped pair if any fails
                if let Err(reason) = self.push_three(real_out, imag_out, phase) {
                    self.restore([real, imag]);
                    return Err(reason)
                }
                Ok(ExecuteState::Proceed)
            }
            Err(reason) => {
                self.restore([real, imag]);
                Err(reason)
            }
        }
    }

    fn push_three(
        &mut self,
        first: Operand,
        second: Operand,
        third: Operand,
    ) -> SimpleResult<()> {
        let mut pushed = 0usize;
        for operand in [first, second, third] {
            if let Err(reason) = self.push_operand(operand) {
                for _ in 0..pushed {
                    self.stack.pop();
                }
                return Err(reason)
            }
            pushed += 1;
        }
        Ok(())
    }
}

fn cell_int<'a>(matrix: &'a Matrix, row: u8, col: u8) -> SimpleResult<&'a T81Big> {
    match matrix.get(row, col) {
        Some(Operand::BigInt(value)) => Ok(value),
        _ => Err(FaultReason::TypeMismatch),
    }
}

fn saturating_accum(
    a: &[Operand],
    b: &[Operand],
    boundary: u64,
) -> SimpleResult<(Vec<Operand>, u64)> {
    let limit = T81Big::from_i64(boundary as i64);
    let mut cells = Vec::with_capacity(a.len());
    let mut raw_max = 0u64;
    for (x, y) in a.iter().zip(b) {
        let (Operand::BigInt(x), Operand::BigInt(y)) = (x, y) else {
            return Err(FaultReason::TypeMismatch)
        };
        let sum = x.add(y);
        let raw = sum.magnitude_clamped();
        raw_max = raw_max.max(raw);
        let clamped = if raw > boundary {
            if sum.is_negative() {
                limit.neg()
            } else {
                limit.clone()
            }
        } else {
            sum
        };
        cells.push(Operand::BigInt(clamped));
    }
    Ok((cells, raw_max))
}

fn holo_fft(
    real: &Operand,
    imag: &Operand,
) -> SimpleResult<(Operand, Operand, Operand)> {
    let (Operand::Tensor(real), Operand::Tensor(imag)) = (real, imag) else {
        return Err(FaultReason::TypeMismatch)
    };
    let holo = T729HoloTensor::new(real.clone(), imag.clone())
        .map_err(|_| FaultReason::TypeMismatch)?;
    let lane = holo.real.last_axis();
    if !is_power_of_three(lane) {
        return Err(FaultReason::OpcodeFailed)
    }

    let re = tensor_lanes(&holo.real)?;
    let im = tensor_lanes(&holo.imag)?;

    let mut re_out = Vec::with_capacity(re.len());
    let mut im_out = Vec::with_capacity(im.len());
    for (re_lane, im_lane) in re.chunks(lane).zip(im.chunks(lane)) {
        let (r, i) = fft_radix3(re_lane, im_lane);
        re_out.extend(r);
        im_out.extend(i);
    }

    // phase over the leading lane, quantized to 2π/729
    let quantum = TAU / f64::from(PHASE_QUANTA);
    let phase: Vec<Operand> = (0..lane)
        .map(|index| {
            let angle = im_out[index].atan2(re_out[index]);
            let quanta = (angle / quantum).round() as i64;
            Operand::BigInt(T81Big::from_i64(
                quanta.rem_euclid(i64::from(PHASE_QUANTA)),
            ))
        })
        .collect();

    let real_cells = rounded_cells(&re_out)?;
    let imag_cells = rounded_cells(&im_out)?;
    let shape = holo.real.shape().to_vec();
    let real_tensor = Tensor::new(shape.clone(), real_cells)
        .map_err(|_| FaultReason::MalformedOperand)?;
    let imag_tensor = Tensor::new(shape, imag_cells)
        .map_err(|_| FaultReason::MalformedOperand)?;
    let phase_vector =
        Vector::new(phase).map_err(|_| FaultReason::MalformedOperand)?;
    Ok((
        Operand::Tensor(real_tensor),
        Operand::Tensor(imag_tensor),
        Operand::Vector(phase_vector),
    ))
}

fn tensor_lanes(tensor: &Tensor) -> SimpleResult<Vec<f64>> {
    tensor
        .data()
        .iter()
        .map(|cell| match cell {
            Operand::BigInt(value) => value
                .to_i64()
                .map(|v| v as f64)
                .map_err(|_| FaultReason::Overflow),
            _ => Err(FaultReason::TypeMismatch),
        })
        .collect()
}

fn rounded_cells(values: &[f64]) -> SimpleResult<Vec<Operand>> {
    values
        .iter()
        .map(|&value| {
            if !value.is_finite() || value.abs() >= i64::MAX as f64 {
                return Err(FaultReason::Overflow)
            }
            Ok(Operand::BigInt(T81Big::from_i64(value.round() as i64)))
        })
        .collect()
}

fn is_power_of_three(mut n: usize) -> bool {
    if n == 0 {
        return false
    }
    while n % 3 == 0 {
        n /= 3;
    }
    n == 1
}

/// Decimation-in-time radix-3 Cooley–Tukey; `re.len()` is a power of three.
fn fft_radix3(re: &[f64], im: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let n = re.len();
    if n == 1 {
        return (re.to_vec(), im.to_vec())
    }
    let third = n / 3;

    let mut parts_re = [Vec::with_capacity(third), Vec::with_capacity(third), Vec::with_capacity(third)];
    let mut parts_im = [Vec::with_capacity(third), Vec::with_capacity(third), Vec::with_capacity(third)];
    for index in 0..n {
        parts_re[index % 3].push(re[index]);
        parts_im[index % 3].push(im[index]);
    }
    let spectra: Vec<(Vec<f64>, Vec<f64>)> = (0..3)
        .map(|branch| fft_radix3(&parts_re[branch], &parts_im[branch]))
        .collect();

    let mut out_re = vec![0.0; n];
    let mut out_im = vec![0.0; n];
    for k in 0..third {
        for s in 0..3 {
            let bin = k + s * third;
            let mut sum_re = 0.0;
            let mut sum_im = 0.0;
            for (j, (branch_re, branch_im)) in spectra.iter().enumerate() {
                let angle = -TAU * (j * bin) as f64 / n as f64;
                let (sin, cos) = angle.sin_cos();
                sum_re += cos * branch_re[k] - sin * branch_im[k];
                sum_im += sin * branch_re[k] + cos * branch_im[k];
            }
            out_re[bin] = sum_re;
            out_im[bin] = sum_im;
        }
    }
    (out_re, out_im)
}
