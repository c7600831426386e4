use super::sabr::{sabr_calibrate, sabr_volatility, SabrParameters};
use super::smile::{FlatSmileSection, InterpolatedSmileSection, SmileSection};
use crate::common::{Real, Time, Volatility};
use crate::handle::Handle;
use crate::math::interpolation::{Extrapolation, LinearInterpolation};
use crate::observer::Observable;
use crate::time::{Date, DayCount};
use crate::{error::PricingResult, require};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Moneyness checkpoints used when a smile section is sampled from a
/// volatility structure.
const SECTION_MONEYNESS: [Real; 9] = [0.25, 0.5, 0.75, 0.9, 1.0, 1.1, 1.25, 1.5, 2.0];

/// Swaption volatilities as a function of option date, underlying swap
/// length and strike.
pub trait SwaptionVolatilityStructure {
    fn observable(&self) -> &Observable;

    fn reference_date(&self) -> Date;

    fn day_count(&self) -> DayCount {
        DayCount::Actual365Fixed
    }

    fn exercise_time(&self, option_date: Date) -> Time {
        self.day_count()
            .year_fraction(self.reference_date(), option_date)
    }

    /// Black volatility; `forward` locates the smile.
    fn volatility(
        &self,
        option_date: Date,
        swap_length: Time,
        strike: Real,
        forward: Real,
    ) -> PricingResult<Volatility>;

    /// Smile section at the given node, sampled over a moneyness grid.
    fn smile_section(
        &self,
        option_date: Date,
        swap_length: Time,
        forward: Real,
    ) -> PricingResult<Rc<dyn SmileSection>> {
        let t = self.exercise_time(option_date);
        let mut strikes = Vec::with_capacity(SECTION_MONEYNESS.len());
        let mut stddevs = Vec::with_capacity(SECTION_MONEYNESS.len());
        for &m in &SECTION_MONEYNESS {
            let k = m * forward;
            strikes.push(k);
            stddevs.push(self.volatility(option_date, swap_length, k, forward)? * t.sqrt());
        }
        Ok(Rc::new(InterpolatedSmileSection::new(
            t, strikes, stddevs, forward,
        )?))
    }
}

/// Strike- and node-independent swaption volatility.
pub struct ConstantSwaptionVolatility {
    reference_date: Date,
    vol: Volatility,
    day_count: DayCount,
    observable: Observable,
}

impl ConstantSwaptionVolatility {
    pub fn new(reference_date: Date, vol: Volatility, day_count: DayCount) -> Self {
        Self {
            reference_date,
            vol,
            day_count,
            observable: Observable::new(),
        }
    }
}

impl SwaptionVolatilityStructure for ConstantSwaptionVolatility {
    fn observable(&self) -> &Observable {
        &self.observable
    }

    fn reference_date(&self) -> Date {
        self.reference_date
    }

    fn day_count(&self) -> DayCount {
        self.day_count
    }

    fn volatility(
        &self,
        _option_date: Date,
        _swap_length: Time,
        _strike: Real,
        _forward: Real,
    ) -> PricingResult<Volatility> {
        Ok(self.vol)
    }

    fn smile_section(
        &self,
        option_date: Date,
        _swap_length: Time,
        forward: Real,
    ) -> PricingResult<Rc<dyn SmileSection>> {
        Ok(Rc::new(FlatSmileSection::new(
            self.exercise_time(option_date),
            self.vol,
            forward,
        )?))
    }
}

/// ATM volatility matrix, bilinear in (option time, swap length).
pub struct SwaptionVolatilityMatrix {
    reference_date: Date,
    day_count: DayCount,
    option_times: Vec<Time>,
    swap_lengths: Vec<Time>,
    vols: Vec<Vec<Volatility>>,
    observable: Observable,
}

impl SwaptionVolatilityMatrix {
    pub fn new(
        reference_date: Date,
        option_dates: Vec<Date>,
        swap_lengths: Vec<Time>,
        vols: Vec<Vec<Volatility>>,
        day_count: DayCount,
    ) -> PricingResult<Self> {
        require!(
            !option_dates.is_empty() && !swap_lengths.is_empty(),
            "empty swaption volatility matrix"
        );
        require!(
            vols.len() == option_dates.len(),
            "vol matrix has {} rows, expected {}",
            vols.len(),
            option_dates.len()
        );
        require!(
            vols.iter().all(|row| row.len() == swap_lengths.len()),
            "vol matrix rows must match the swap-length axis"
        );
        let option_times = option_dates
            .iter()
            .map(|&d| day_count.year_fraction(reference_date, d))
            .collect::<Vec<_>>();
        require!(
            option_times.windows(2).all(|w| w[0] < w[1]),
            "option dates must be increasing"
        );
        require!(
            swap_lengths.windows(2).all(|w| w[0] < w[1]),
            "swap lengths must be increasing"
        );
        Ok(Self {
            reference_date,
            day_count,
            option_times,
            swap_lengths,
            vols,
            observable: Observable::new(),
        })
    }

    fn bracket(axis: &[Time], x: Time) -> (usize, usize, Real) {
        if x <= axis[0] {
            return (0, 0, 0.0);
        }
        let n = axis.len();
        if x >= axis[n - 1] {
            return (n - 1, n - 1, 0.0);
        }
        let hi = axis.partition_point(|&a| a < x);
        let lo = hi - 1;
        let w = (x - axis[lo]) / (axis[hi] - axis[lo]);
        (lo, hi, w)
    }

    fn atm_vol(&self, option_time: Time, swap_length: Time) -> Volatility {
        let (i0, i1, wi) = Self::bracket(&self.option_times, option_time);
        let (j0, j1, wj) = Self::bracket(&self.swap_lengths, swap_length);
        let v00 = self.vols[i0][j0];
        let v01 = self.vols[i0][j1];
        let v10 = self.vols[i1][j0];
        let v11 = self.vols[i1][j1];
        (1.0 - wi) * ((1.0 - wj) * v00 + wj * v01) + wi * ((1.0 - wj) * v10 + wj * v11)
    }
}

impl SwaptionVolatilityStructure for SwaptionVolatilityMatrix {
    fn observable(&self) -> &Observable {
        &self.observable
    }

    fn reference_date(&self) -> Date {
        self.reference_date
    }

    fn day_count(&self) -> DayCount {
        self.day_count
    }

    fn volatility(
        &self,
        option_date: Date,
        swap_length: Time,
        _strike: Real,
        _forward: Real,
    ) -> PricingResult<Volatility> {
        Ok(self.atm_vol(self.exercise_time(option_date), swap_length))
    }
}

/// How the cube fills in the smile between the quoted strike spreads.
pub enum CubeInterpolation {
    /// Linear in strike spread, bilinear across nodes.
    Linear,
    /// Per-node SABR fits to the spread quotes; the initial guess is
    /// supplied by the user.
    Sabr {
        guess: SabrParameters,
        fixed_beta: bool,
    },
}

/// ATM matrix plus strike-spread volatilities: the full cube.
pub struct SwaptionVolatilityCube {
    atm: Handle<SwaptionVolatilityMatrix>,
    strike_spreads: Vec<Real>,
    /// `vol_spreads[i][j]` holds one spread curve per (option, swap) node.
    vol_spreads: Vec<Vec<Vec<Volatility>>>,
    interpolation: CubeInterpolation,
    sabr_cache: RefCell<HashMap<(usize, usize), (Real, SabrParameters)>>,
    observable: Observable,
}

impl SwaptionVolatilityCube {
    pub fn new(
        atm: Handle<SwaptionVolatilityMatrix>,
        strike_spreads: Vec<Real>,
        vol_spreads: Vec<Vec<Vec<Volatility>>>,
        interpolation: CubeInterpolation,
    ) -> PricingResult<Self> {
        require!(
            strike_spreads.len() >= 2,
            "need at least two strike spreads, got {}",
            strike_spreads.len()
        );
        require!(
            strike_spreads.windows(2).all(|w| w[0] < w[1]),
            "strike spreads must be increasing"
        );
        require!(
            vol_spreads.len() == atm.option_times.len(),
            "spread cube has {} option rows, expected {}",
            vol_spreads.len(),
            atm.option_times.len()
        );
        for row in &vol_spreads {
            require!(
                row.len() == atm.swap_lengths.len(),
                "spread cube row length mismatch"
            );
            for node in row {
                require!(
                    node.len() == strike_spreads.len(),
                    "spread curve length mismatch at a cube node"
                );
            }
        }
        Ok(Self {
            atm,
            strike_spreads,
            vol_spreads,
            interpolation,
            sabr_cache: RefCell::new(HashMap::new()),
            observable: Observable::new(),
        })
    }

    fn node_vol(
        &self,
        i: usize,
        j: usize,
        strike: Real,
        forward: Real,
    ) -> PricingResult<Volatility> {
        let atm_vol = self.atm.vols[i][j];
        match &self.interpolation {
            CubeInterpolation::Linear => {
                let spread_curve = LinearInterpolation::new(
                    self.strike_spreads.clone(),
                    self.vol_spreads[i][j].clone(),
                    Extrapolation::Flat,
                )?;
                Ok((atm_vol + spread_curve.value(strike - forward)).max(1e-8))
            }
            CubeInterpolation::Sabr { guess, fixed_beta } => {
                let expiry = self.atm.option_times[i].max(1e-8);
                let mut cache = self.sabr_cache.borrow_mut();
                let needs_fit = match cache.get(&(i, j)) {
                    Some((f, _)) => (f - forward).abs() > 1e-12,
                    None => true,
                };
                if needs_fit {
                    let strikes: Vec<Real> = self
                        .strike_spreads
                        .iter()
                        .map(|s| (forward + s).max(1e-6))
                        .collect();
                    let vols: Vec<Volatility> = self.vol_spreads[i][j]
                        .iter()
                        .map(|s| (atm_vol + s).max(1e-8))
                        .collect();
                    let fitted =
                        sabr_calibrate(&strikes, &vols, forward, expiry, *guess, *fixed_beta)?;
                    cache.insert((i, j), (forward, fitted));
                }
                let (_, params) = cache[&(i, j)];
                Ok(sabr_volatility(strike.max(1e-8), forward, expiry, &params))
            }
        }
    }
}

impl SwaptionVolatilityStructure for SwaptionVolatilityCube {
    fn observable(&self) -> &Observable {
        &self.observable
    }

    fn reference_date(&self) -> Date {
        self.atm.reference_date()
    }

    fn day_count(&self) -> DayCount {
        self.atm.day_count()
    }

    fn volatility(
        &self,
        option_date: Date,
        swap_length: Time,
        strike: Real,
        forward: Real,
    ) -> PricingResult<Volatility> {
        let option_time = self.exercise_time(option_date);
        let (i0, i1, wi) = SwaptionVolatilityMatrix::bracket(&self.atm.option_times, option_time);
        let (j0, j1, wj) = SwaptionVolatilityMatrix::bracket(&self.atm.swap_lengths, swap_length);
        let v00 = self.node_vol(i0, j0, strike, forward)?;
        let v01 = self.node_vol(i0, j1, strike, forward)?;
        let v10 = self.node_vol(i1, j0, strike, forward)?;
        let v11 = self.node_vol(i1, j1, strike, forward)?;
        Ok((1.0 - wi) * ((1.0 - wj) * v00 + wj * v01) + wi * ((1.0 - wj) * v10 + wj * v11))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> Date {
        Date::from_dmy(14, 11, 2012).unwrap()
    }

    fn matrix() -> Handle<SwaptionVolatilityMatrix> {
        let r = reference();
        Handle::new(
            SwaptionVolatilityMatrix::new(
                r,
                vec![r.plus_years(1).unwrap(), r.plus_years(5).unwrap()],
                vec![1.0, 10.0],
                vec![vec![0.20, 0.18], vec![0.16, 0.14]],
                DayCount::Actual365Fixed,
            )
            .unwrap(),
        )
    }

    #[test]
    fn matrix_reproduces_nodes_and_interpolates() {
        let m = matrix();
        let r = reference();
        let d1 = r.plus_years(1).unwrap();
        assert!((m.volatility(d1, 1.0, 0.0, 0.03).unwrap() - 0.20).abs() < 1e-12);
        let d3 = r.plus_years(3).unwrap();
        let v = m.volatility(d3, 1.0, 0.0, 0.03).unwrap();
        assert!(v < 0.20 && v > 0.16);
    }

    #[test]
    fn constant_structure_builds_flat_smiles() {
        let c = ConstantSwaptionVolatility::new(reference(), 0.20, DayCount::Actual365Fixed);
        let section = c
            .smile_section(reference().plus_years(1).unwrap(), 5.0, 0.03)
            .unwrap();
        assert!((section.volatility(0.01).unwrap() - 0.20).abs() < 1e-12);
        assert!((section.volatility(0.10).unwrap() - 0.20).abs() < 1e-12);
    }

    #[test]
    fn linear_cube_adds_strike_spreads() {
        let spreads = vec![-0.01, 0.0, 0.01];
        let node = vec![0.02, 0.0, 0.015];
        let cube = SwaptionVolatilityCube::new(
            matrix(),
            spreads,
            vec![vec![node.clone(), node.clone()], vec![node.clone(), node]],
            CubeInterpolation::Linear,
        )
        .unwrap();
        let d = reference().plus_years(1).unwrap();
        let atm = cube.volatility(d, 1.0, 0.03, 0.03).unwrap();
        assert!((atm - 0.20).abs() < 1e-12);
        let low = cube.volatility(d, 1.0, 0.02, 0.03).unwrap();
        assert!((low - 0.22).abs() < 1e-12);
        // Half-way in strike spread.
        let mid = cube.volatility(d, 1.0, 0.025, 0.03).unwrap();
        assert!((mid - 0.21).abs() < 1e-12);
    }

    #[test]
    fn sabr_cube_fits_the_quoted_smile() {
        let truth = SabrParameters {
            alpha: 0.05,
            beta: 0.6,
            nu: 0.4,
            rho: -0.2,
        };
        let forward = 0.03;
        let expiry = 1.0;
        let spreads = vec![-0.02, -0.01, 0.0, 0.01, 0.02];
        let atm_vol = sabr_volatility(forward, forward, expiry, &truth);
        let node: Vec<Real> = spreads
            .iter()
            .map(|s| sabr_volatility(forward + s, forward, expiry, &truth) - atm_vol)
            .collect();

        let r = reference();
        let atm = Handle::new(
            SwaptionVolatilityMatrix::new(
                r,
                vec![r.plus_years(1).unwrap(), r.plus_years(5).unwrap()],
                vec![1.0, 10.0],
                vec![vec![atm_vol, atm_vol], vec![atm_vol, atm_vol]],
                DayCount::Actual365Fixed,
            )
            .unwrap(),
        );
        let cube = SwaptionVolatilityCube::new(
            atm,
            spreads,
            vec![
                vec![node.clone(), node.clone()],
                vec![node.clone(), node.clone()],
            ],
            CubeInterpolation::Sabr {
                guess: SabrParameters {
                    alpha: 0.03,
                    beta: 0.6,
                    nu: 0.2,
                    rho: 0.0,
                },
                fixed_beta: true,
            },
        )
        .unwrap();

        let d = r.plus_years(1).unwrap();
        for &k in &[0.015, 0.02, 0.03, 0.045] {
            let fitted = cube.volatility(d, 1.0, k, forward).unwrap();
            let expected = sabr_volatility(k, forward, expiry, &truth);
            assert!(
                (fitted - expected).abs() < 5e-4,
                "sabr cube off at strike {k}: {fitted} vs {expected}"
            );
        }
    }
}
