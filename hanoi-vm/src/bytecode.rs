//! Streaming codec for the wire format
//!
//! Tagged operands are length-prefixed and tag-prefixed; digit runs carry
//! their sign in the MSB of the length byte. Decoding accepts only canonical
//! encodings, which makes `encode(decode(x)) == x` literal: the assembler
//! reproduces loader-accepted bytes exactly.

use hanoi_asm::Tag;
use hanoi_ternary::T81Big;

use crate::{
    consts::{MAX_OPERAND_DEPTH, MAX_RUN_DIGITS},
    error::LoadError,
    operand::{Graph, Matrix, Operand, OperandViolation, Polynomial, Tensor, Vector},
};

/// Decode one tagged operand at `offset`, advancing it past the operand.
pub fn decode_operand(bytes: &[u8], offset: &mut usize) -> Result<Operand, LoadError> {
    decode_nested(bytes, offset, 0)
}

fn decode_nested(
    bytes: &[u8],
    offset: &mut usize,
    depth: usize,
) -> Result<Operand, LoadError> {
    let tag_offset = *offset;
    let tag_byte = take(bytes, offset)?;
    let tag = Tag::try_from(tag_byte).map_err(|_| LoadError::MalformedOperand {
        tag: tag_byte,
        offset: tag_offset,
        reason: "unrecognized tag",
    })?;
    if depth >= MAX_OPERAND_DEPTH {
        return Err(malformed(tag, tag_offset, "operand nesting too deep"))
    }

    match tag {
        Tag::Bigint => {
            let value = decode_run(bytes, offset, tag, tag_offset)?;
            Ok(Operand::BigInt(value))
        }
        Tag::Fraction => {
            let num = decode_run(bytes, offset, tag, tag_offset)?;
            let den = decode_run(bytes, offset, tag, tag_offset)?;
            if den.is_zero() {
                return Err(malformed(tag, tag_offset, "zero denominator"))
            }
            Ok(Operand::Fraction { num, den })
        }
        Tag::Float => {
            let mantissa = decode_run(bytes, offset, tag, tag_offset)?;
            let exponent = take(bytes, offset)? as i8;
            Ok(Operand::Float { mantissa, exponent })
        }
        Tag::Matrix => {
            let rows = take(bytes, offset)?;
            let cols = take(bytes, offset)?;
            let count = usize::from(rows) * usize::from(cols);
            let mut cells = Vec::with_capacity(count);
            for _ in 0..count {
                cells.push(decode_nested(bytes, offset, depth + 1)?);
            }
            let matrix = Matrix::new(rows, cols, cells)
                .map_err(|violation| attribute(violation, tag_offset))?;
            Ok(Operand::Matrix(matrix))
        }
        Tag::Vector => {
            let elements = decode_sequence(bytes, offset, depth)?;
            let vector = Vector::new(elements)
                .map_err(|violation| attribute(violation, tag_offset))?;
            Ok(Operand::Vector(vector))
        }
        Tag::Tensor => {
            let rank = take(bytes, offset)?;
            let mut shape = Vec::with_capacity(usize::from(rank));
            for _ in 0..rank {
                shape.push(take(bytes, offset)?);
            }
            // volume bounded before decoding so a hostile shape cannot
            // demand more operands than the body can hold
            let volume: u64 = shape.iter().map(|&dim| u64::from(dim)).product();
            if rank == 0 || volume == 0 || volume > bytes.len() as u64 {
                return Err(malformed(tag, tag_offset, "shape product out of range"))
            }
            let mut data = Vec::with_capacity(volume as usize);
            for _ in 0..volume {
                data.push(decode_nested(bytes, offset, depth + 1)?);
            }
            let tensor = Tensor::new(shape, data)
                .map_err(|violation| attribute(violation, tag_offset))?;
            Ok(Operand::Tensor(tensor))
        }
        Tag::Polynomial => {
            let coefficients = decode_sequence(bytes, offset, depth)?;
            let poly = Polynomial::new(coefficients)
                .map_err(|violation| attribute(violation, tag_offset))?;
            Ok(Operand::Polynomial(poly))
        }
        Tag::Graph => {
            let nodes = take(bytes, offset)?;
            let edge_count = take(bytes, offset)?;
            let mut edges = Vec::with_capacity(usize::from(edge_count));
            for _ in 0..edge_count {
                let u = take(bytes, offset)?;
                let v = take(bytes, offset)?;
                edges.push((u, v));
            }
            let graph = Graph::new(nodes, edges)
                .map_err(|violation| attribute(violation, tag_offset))?;
            Ok(Operand::Graph(graph))
        }
        Tag::Quaternion => {
            let x = decode_run(bytes, offset, tag, tag_offset)?;
            let y = decode_run(bytes, offset, tag, tag_offset)?;
            let z = decode_run(bytes, offset, tag, tag_offset)?;
            let w = decode_run(bytes, offset, tag, tag_offset)?;
            Ok(Operand::Quaternion(crate::operand::Quaternion::new(x, y, z, w)))
        }
        Tag::Opcode => {
            let code = take(bytes, offset)?;
            Ok(Operand::Opcode(code))
        }
    }
}

/// Encode one tagged operand, mirroring [`decode_operand`] byte for byte.
pub fn encode_operand(operand: &Operand, out: &mut Vec<u8>) -> Result<(), LoadError> {
    out.push(operand.tag().code());
    match operand {
        Operand::BigInt(value) => encode_run(value, out),
        Operand::Fraction { num, den } => {
            encode_run(num, out)?;
            encode_run(den, out)
        }
        Operand::Float { mantissa, exponent } => {
            encode_run(mantissa, out)?;
            out.push(*exponent as u8);
            Ok(())
        }
        Operand::Matrix(matrix) => {
            out.push(matrix.rows());
            out.push(matrix.cols());
            matrix
                .cells()
                .iter()
                .try_for_each(|cell| encode_operand(cell, out))
        }
        Operand::Vector(vector) => {
            out.push(vector.len() as u8);
            vector
                .elements()
                .iter()
                .try_for_each(|element| encode_operand(element, out))
        }
        Operand::Tensor(tensor) => {
            out.push(tensor.shape().len() as u8);
            out.extend_from_slice(tensor.shape());
            tensor
                .data()
                .iter()
                .try_for_each(|cell| encode_operand(cell, out))
        }
        Operand::Polynomial(poly) => {
            out.push(poly.coefficients().len() as u8);
            poly.coefficients()
                .iter()
                .try_for_each(|coefficient| encode_operand(coefficient, out))
        }
        Operand::Graph(graph) => {
            out.push(graph.nodes());
            out.push(graph.edges().len() as u8);
            for &(u, v) in graph.edges() {
                out.push(u);
                out.push(v);
            }
            Ok(())
        }
        Operand::Quaternion(quat) => {
            encode_run(&quat.x, out)?;
            encode_run(&quat.y, out)?;
            encode_run(&quat.z, out)?;
            encode_run(&quat.w, out)
        }
        Operand::Opcode(code) => {
            out.push(*code);
            Ok(())
        }
    }
}

/// Decode a signed digit run: sign in the length MSB, canonical digits.
fn decode_run(
    bytes: &[u8],
    offset: &mut usize,
    tag: Tag,
    tag_offset: usize,
) -> Result<T81Big, LoadError> {
    let head = take(bytes, offset)?;
    let negative = head & 0x80 != 0;
    let len = usize::from(head & 0x7f);
    if len == 0 {
        return Err(malformed(tag, tag_offset, "empty digit run"))
    }
    let end = offset
        .checked_add(len)
        .filter(|&end| end <= bytes.len())
        .ok_or(LoadError::Truncated(bytes.len()))?;
    let digits = bytes[*offset..end].to_vec();
    *offset = end;
    if len > 1 && digits.last() == Some(&0) {
        return Err(malformed(tag, tag_offset, "high zero digit"))
    }
    let value = T81Big::from_digits(negative, digits)
        .map_err(|_| malformed(tag, tag_offset, "digit outside 0..81"))?;
    if negative && value.is_zero() {
        return Err(malformed(tag, tag_offset, "negative zero"))
    }
    Ok(value)
}

fn encode_run(value: &T81Big, out: &mut Vec<u8>) -> Result<(), LoadError> {
    let digits = value.digits();
    if digits.len() > MAX_RUN_DIGITS {
        return Err(LoadError::MalformedOperand {
            tag: Tag::Bigint.code(),
            offset: out.len(),
            reason: "digit run longer than 127",
        })
    }
    let mut head = digits.len() as u8;
    if value.is_negative() {
        head |= 0x80;
    }
    out.push(head);
    out.extend_from_slice(digits);
    Ok(())
}

fn decode_sequence(
    bytes: &[u8],
    offset: &mut usize,
    depth: usize,
) -> Result<Vec<Operand>, LoadError> {
    let len = take(bytes, offset)?;
    let mut elements = Vec::with_capacity(usize::from(len));
    for _ in 0..len {
        elements.push(decode_nested(bytes, offset, depth + 1)?);
    }
    Ok(elements)
}

fn take(bytes: &[u8], offset: &mut usize) -> Result<u8, LoadError> {
    let byte = bytes
        .get(*offset)
        .copied()
        .ok_or(LoadError::Truncated(bytes.len()))?;
    *offset += 1;
    Ok(byte)
}

const fn malformed(tag: Tag, offset: usize, reason: &'static str) -> LoadError {
    LoadError::MalformedOperand {
        tag: tag.code(),
        offset,
        reason,
    }
}

fn attribute(violation: OperandViolation, offset: usize) -> LoadError {
    LoadError::MalformedOperand {
        tag: violation.tag.code(),
        offset,
        reason: violation.reason,
    }
}
