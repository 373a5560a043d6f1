use crate::complex::Complex;
use crate::error::CoreError;

/// Outcome of iterating a single point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EscapeResult {
    /// The orbit left the bound after `n` completed iterations.
    Escaped(u32),

    /// The orbit stayed inside the bound for the whole iteration budget.
    Bounded,
}

impl EscapeResult {
    #[inline]
    pub fn is_bounded(self) -> bool {
        matches!(self, Self::Bounded)
    }

    /// Iteration count for escaped points, `None` for bounded ones.
    #[inline]
    pub fn iterations(self) -> Option<u32> {
        match self {
            Self::Escaped(n) => Some(n),
            Self::Bounded => None,
        }
    }
}

/// Iteration budget and bound shared by every evaluation in a render pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EscapeParams {
    /// Maximum number of iterations before a point is declared bounded.
    pub max_iterations: u32,

    /// Squared escape magnitude; `4.0` is the conventional `|z| = 2`.
    pub bound_squared: f64,
}

impl EscapeParams {
    pub const DEFAULT_MAX_ITERATIONS: u32 = 512;
    pub const DEFAULT_BOUND_SQUARED: f64 = 4.0;

    pub fn new(max_iterations: u32, bound_squared: f64) -> crate::Result<Self> {
        if max_iterations < 1 {
            return Err(CoreError::InvalidMaxIterations(max_iterations));
        }
        if bound_squared <= 0.0 || !bound_squared.is_finite() {
            return Err(CoreError::InvalidBound(bound_squared));
        }
        Ok(Self {
            max_iterations,
            bound_squared,
        })
    }
}

impl Default for EscapeParams {
    fn default() -> Self {
        Self {
            max_iterations: Self::DEFAULT_MAX_ITERATIONS,
            bound_squared: Self::DEFAULT_BOUND_SQUARED,
        }
    }
}

/// A per-point escape-time formula.
///
/// Implementations must be pure: the renderer calls `evaluate` from many
/// worker threads at once and relies on identical inputs giving identical
/// results (the edge accelerator depends on it). The iteration budget and
/// bound come from the engine's current configuration on every call, so a
/// reconfigured bound applies to every formula without rebuilding it.
///
/// Renderers are generic over `E: EscapeFunction` rather than using
/// `dyn EscapeFunction`, so the hot loop is monomorphised and inlined.
/// Plain closures work too:
///
/// ```
/// use tilebrot_core::{Complex, EscapeFunction, EscapeParams, EscapeResult};
///
/// let constant = |_c: Complex, _params: &EscapeParams| EscapeResult::Escaped(5);
/// let params = EscapeParams::default();
/// assert_eq!(constant.evaluate(Complex::ZERO, &params), EscapeResult::Escaped(5));
/// ```
pub trait EscapeFunction: Send + Sync {
    fn evaluate(&self, c: Complex, params: &EscapeParams) -> EscapeResult;
}

impl<F> EscapeFunction for F
where
    F: Fn(Complex, &EscapeParams) -> EscapeResult + Send + Sync,
{
    #[inline]
    fn evaluate(&self, c: Complex, params: &EscapeParams) -> EscapeResult {
        self(c, params)
    }
}

/// The Mandelbrot set: `z_{n+1} = z_n² + c`, starting from `z₀ = 0`.
///
/// An orbit that reaches the bound (`|z|² >= bound_squared`) counts as
/// escaped, so `c = 2` escapes on the first step. The same rule makes
/// `c = -2`, which lies in the set with `|z₁|² = 4` exactly, report
/// `Escaped(0)` under the default bound.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Mandelbrot;

impl EscapeFunction for Mandelbrot {
    #[inline]
    fn evaluate(&self, c: Complex, params: &EscapeParams) -> EscapeResult {
        let mut z = Complex::ZERO;
        for n in 0..params.max_iterations {
            z = z.square_add(c);
            if z.norm_sq() >= params.bound_squared {
                return EscapeResult::Escaped(n);
            }
        }
        EscapeResult::Bounded
    }
}
