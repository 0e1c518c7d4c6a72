//! Chebyshev polynomial evaluation for DE coefficient sets
//!
//! Each item stores, per subinterval, `cpec` coefficients for every
//! component, laid out component after component:
//! `[x0 .. x(cpec-1), y0 .. y(cpec-1), z0 .. z(cpec-1)]`.
//!
//! Values are `sum(T_j(t) * c_j)` at the normalized time `t` in [-1, 1].
//! Rates use the derivatives `T'_j(t)` and are scaled from normalized time
//! to seconds.

/// Seconds in half a day
///
/// A subinterval of `block_span / n` days maps onto 2 units of normalized
/// time, so `dt/dJED = 2n / block_span` per day, or `n / (43200 * block_span)`
/// per second.
const HALF_DAY_SECONDS: f64 = 43200.0;

/// Chebyshev polynomials of the first kind `T_0(t) .. T_{count-1}(t)`
pub fn position_basis(t: f64, count: usize) -> Vec<f64> {
    let mut basis = Vec::with_capacity(count);
    for n in 0..count {
        let value = match n {
            0 => 1.0,
            1 => t,
            _ => 2.0 * t * basis[n - 1] - basis[n - 2],
        };
        basis.push(value);
    }
    basis
}

/// Derivatives `T'_0(t) .. T'_{n-1}(t)` given the position basis at `t`
///
/// Uses `T'_n = 2 T_{n-1} + 2t T'_{n-1} - T'_{n-2}` with `T'_0 = 0`,
/// `T'_1 = 1`, which gives `T'_2 = 4t`.
pub fn derivative_basis(t: f64, position: &[f64]) -> Vec<f64> {
    let mut basis = Vec::with_capacity(position.len());
    for n in 0..position.len() {
        let value = match n {
            0 => 0.0,
            1 => 1.0,
            _ => 2.0 * position[n - 1] + 2.0 * t * basis[n - 1] - basis[n - 2],
        };
        basis.push(value);
    }
    basis
}

/// Factor converting a normalized-time derivative into a per-second rate
pub fn derivative_scale(subintervals: usize, block_span: f64) -> f64 {
    subintervals as f64 / (HALF_DAY_SECONDS * block_span)
}

/// Evaluate `component_count` components at normalized time `t`
///
/// Returns the values, followed by the rates when `want_derivative` is set
/// (each rate multiplied by `derivative_scale`). `coeffs` must hold at least
/// `component_count * cpec` values; shorter input yields only the
/// components it can fill.
pub fn evaluate(
    coeffs: &[f64],
    cpec: usize,
    t: f64,
    component_count: usize,
    want_derivative: bool,
    derivative_scale: f64,
) -> Vec<f64> {
    let size = if want_derivative {
        2 * component_count
    } else {
        component_count
    };
    let mut result = vec![0.0; size];
    if cpec == 0 {
        return result;
    }

    let position = position_basis(t, cpec);
    let derivative = if want_derivative {
        derivative_basis(t, &position)
    } else {
        Vec::new()
    };

    for (i, set) in coeffs.chunks_exact(cpec).take(component_count).enumerate() {
        result[i] = dot(&position, set);
        if want_derivative {
            result[component_count + i] = dot(&derivative, set) * derivative_scale;
        }
    }

    result
}

/// Locate `jed` inside a block split into `subintervals` pieces
///
/// `block_fraction` is the position inside the block in [0, 1]. Returns the
/// subinterval index and the normalized time inside it. The very end of the
/// covered range is evaluated at `t = 1` of the last subinterval.
pub fn subinterval(block_fraction: f64, subintervals: usize, at_end: bool) -> (usize, f64) {
    let last = subintervals.saturating_sub(1);
    if at_end {
        return (last, 1.0);
    }

    let sub_time = block_fraction * subintervals as f64;
    let index = (sub_time.floor().max(0.0) as usize).min(last);
    (index, 2.0 * (sub_time - index as f64) - 1.0)
}

fn dot(basis: &[f64], coeffs: &[f64]) -> f64 {
    basis.iter().zip(coeffs).map(|(b, c)| b * c).sum()
}
