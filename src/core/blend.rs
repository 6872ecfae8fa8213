//! 条件张量插值
//!
//! 在空提示词条件 (reference) 与实际提示词条件 (cond) 之间做线性插值。
//! 张量形状: (batch, sequence, channels)
//!
//! 序列长度不一致时:
//! - cond 更长: 将 reference 沿序列维度重复 `cond_len / ref_len` 次,
//!   若仍比 cond 短 1, 在前面补上 cond 的第一个 token (起始 token 保持不变)
//! - 其余无法对齐的情况返回 [`Error::ShapeMismatch`], 不做截断或填充

use candle_core::Tensor;

use crate::error::Error;

/// 序列维度
const SEQ_DIM: usize = 1;

/// lerp(start, end, weight) = start + weight * (end - start)
///
/// 与 torch.lerp 相同, weight >= 0.5 时从 end 一侧计算,
/// 保证 weight 为 1.0 时结果与 end 完全一致, 为 0.0 时与 start 完全一致。
pub fn lerp(start: &Tensor, end: &Tensor, weight: f64) -> Result<Tensor, Error> {
    let diff = end.sub(start)?;
    let out = if weight < 0.5 {
        start.add(&diff.affine(weight, 0.0)?)?
    } else {
        end.sub(&diff.affine(1.0 - weight, 0.0)?)?
    };
    Ok(out)
}

/// 按 `weight` 在空提示词条件与实际条件之间插值
pub fn blend(cond: &Tensor, reference: &Tensor, weight: f64) -> Result<Tensor, Error> {
    let reference = build_reference(cond, reference)?;
    lerp(&reference, cond, weight)
}

/// 构造与 `cond` 同形状的参考张量
pub fn build_reference(cond: &Tensor, reference: &Tensor) -> Result<Tensor, Error> {
    if cond.rank() != 3 || reference.rank() != 3 {
        return Err(Error::shape_mismatch(
            cond.dims(),
            reference.dims(),
            "conditioning tensors must be (batch, sequence, channels)",
        ));
    }

    let (batch, cond_len, channels) = cond.dims3()?;
    let (_, ref_len, ref_channels) = reference.dims3()?;
    if ref_channels != channels {
        return Err(Error::shape_mismatch(
            cond.dims(),
            reference.dims(),
            format!("channel count {ref_channels} differs from {channels}"),
        ));
    }
    if ref_len == 0 {
        return Err(Error::shape_mismatch(
            cond.dims(),
            reference.dims(),
            "empty reference has no sequence positions",
        ));
    }

    let reference = reference.to_device(cond.device())?.to_dtype(cond.dtype())?;

    let reference = if cond_len > ref_len {
        let repeats = cond_len / ref_len;
        let tiled = if repeats > 1 {
            Tensor::cat(&vec![reference; repeats], SEQ_DIM)?
        } else {
            reference
        };

        if tiled.dim(SEQ_DIM)? + 1 == cond_len {
            let tiled = broadcast_batch(&tiled, cond, batch)?;
            let first_token = cond.narrow(SEQ_DIM, 0, 1)?;
            Tensor::cat(&[&first_token, &tiled], SEQ_DIM)?
        } else {
            tiled
        }
    } else {
        reference
    };

    if reference.dim(SEQ_DIM)? != cond_len {
        return Err(Error::shape_mismatch(
            cond.dims(),
            reference.dims(),
            format!(
                "cannot align reference of length {ref_len} to conditioning of length {cond_len}"
            ),
        ));
    }

    reference
        .broadcast_as(cond.shape())
        .map_err(|e| Error::shape_mismatch(cond.dims(), reference.dims(), e.to_string()))
}

/// 将 batch 为 1 的参考张量扩展到 `batch`
fn broadcast_batch(reference: &Tensor, cond: &Tensor, batch: usize) -> Result<Tensor, Error> {
    let (ref_batch, len, channels) = reference.dims3()?;
    if ref_batch == batch {
        return Ok(reference.clone());
    }
    if ref_batch != 1 {
        return Err(Error::shape_mismatch(
            cond.dims(),
            reference.dims(),
            format!("reference batch {ref_batch} cannot broadcast to {batch}"),
        ));
    }
    Ok(reference
        .broadcast_as((batch, len, channels))?
        .contiguous()?)
}
