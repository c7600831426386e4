use numerair::calibration::{CalibrationHelper, SwaptionHelper};
use numerair::engines::gaussian1d::Gaussian1dSwaptionEngine;
use numerair::handle::Handle;
use numerair::instruments::{SwapKind, Swaption};
use numerair::math::optimization::{EndCriteria, LevenbergMarquardt};
use numerair::models::{
    Adjustments, CalibrationBasket, Gaussian1dModel, MarkovFunctional, ModelSettings,
};
use numerair::termstructure::{FlatForward, TermStructure};
use numerair::time::{Date, DayCount};
use numerair::volatility::{ConstantOptionletVolatility, ConstantSwaptionVolatility};
use std::rc::Rc;

fn reference() -> Date {
    Date::from_dmy(14, 11, 2012).unwrap()
}

fn flat_yts(rate: f64) -> Handle<dyn TermStructure> {
    let curve = Handle::new(FlatForward::new(reference(), rate, DayCount::Actual365Fixed));
    Handle::from_rc(curve.rc() as Rc<dyn TermStructure>)
}

fn swaption_basket() -> CalibrationBasket {
    CalibrationBasket::CoterminalSwaptions {
        expiry_dates: (1..=5)
            .map(|y| reference().plus_years(y).unwrap())
            .collect(),
        terminal_date: reference().plus_years(6).unwrap(),
    }
}

fn flat_swaption_model(adjustments: Adjustments) -> MarkovFunctional {
    MarkovFunctional::with_swaption_smiles(
        flat_yts(0.03),
        Rc::new(ConstantSwaptionVolatility::new(
            reference(),
            0.20,
            DayCount::Actual365Fixed,
        )),
        swaption_basket(),
        0.0,
        ModelSettings::default().with_adjustments(adjustments),
    )
    .unwrap()
}

#[test]
fn flat_basket_calibration_reproduces_zero_rates_and_premia() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .try_init();

    for adjustments in [
        Adjustments::NONE,
        Adjustments::KAHALE_SMILE | Adjustments::SMILE_EXPONENTIAL_EXTRAPOLATION,
    ] {
        let model = flat_swaption_model(adjustments);
        let outputs = model.model_outputs();

        for i in 0..outputs.expiries.len() {
            let rate_diff = (outputs.model_zerorate[i] - outputs.market_zerorate[i]).abs();
            assert!(
                rate_diff < 1e-4,
                "zero rate off at expiry {i}: market {} model {}",
                outputs.market_zerorate[i],
                outputs.model_zerorate[i]
            );
            assert!((outputs.model_zerorate[i] - 0.03).abs() < 1e-4);

            for j in 0..outputs.smile_strikes[i].len() {
                let call_diff =
                    (outputs.model_call_premium[i][j] - outputs.market_call_premium[i][j]).abs();
                let put_diff =
                    (outputs.model_put_premium[i][j] - outputs.market_put_premium[i][j]).abs();
                assert!(
                    call_diff < 1e-4,
                    "call premium off at ({i}, {j}): {call_diff}"
                );
                assert!(put_diff < 1e-4, "put premium off at ({i}, {j}): {put_diff}");
            }
        }
    }
}

#[test]
fn flat_caplet_basket_calibration() {
    let model = MarkovFunctional::with_caplet_smiles(
        flat_yts(0.03),
        Rc::new(ConstantOptionletVolatility::new(
            reference(),
            0.20,
            DayCount::Actual365Fixed,
        )),
        CalibrationBasket::Caplets {
            fixing_dates: (1..=5)
                .map(|y| reference().plus_years(y).unwrap())
                .collect(),
            terminal_date: reference().plus_years(6).unwrap(),
        },
        0.0,
        ModelSettings::default().with_adjustments(Adjustments::NONE),
    )
    .unwrap();
    let outputs = model.model_outputs();
    for i in 0..outputs.expiries.len() {
        assert!(
            (outputs.model_zerorate[i] - outputs.market_zerorate[i]).abs() < 1e-4,
            "caplet calibration zero rate off at {i}"
        );
        for j in 0..outputs.smile_strikes[i].len() {
            let diff =
                (outputs.model_call_premium[i][j] - outputs.market_call_premium[i][j]).abs();
            assert!(diff < 1e-4, "caplet premium off at ({i}, {j}): {diff}");
        }
    }
}

#[test]
fn gaussian1d_engine_agrees_with_black_on_the_calibrated_model() {
    let model = Rc::new(flat_swaption_model(Adjustments::NONE));
    let mut engine = Gaussian1dSwaptionEngine::new(model.clone());
    engine.integration_points = 128;
    let curve = flat_yts(0.03);

    // An ATM swaption from the calibration basket itself.
    let probe = Swaption::coterminal("PROBE", SwapKind::Payer, reference(), 2, 6, 0.01).unwrap();
    let atm = probe.forward_rate(&*curve).unwrap();
    let swaption =
        Swaption::coterminal("ATM", SwapKind::Payer, reference(), 2, 6, atm).unwrap();

    let model_npv = engine.npv(&swaption).unwrap();
    let helper = SwaptionHelper::new(
        curve.clone(),
        swaption.expiry,
        swaption.payment_dates.clone(),
        swaption.accruals.clone(),
        Some(atm),
        0.20,
        1.0,
    )
    .unwrap();
    let market_npv = helper.market_value().unwrap();
    assert!(
        (model_npv - market_npv).abs() < 1e-3,
        "engine {model_npv} vs black {market_npv}"
    );
}

#[test]
fn numeraire_surface_is_usable_by_engines() {
    let model = flat_swaption_model(Adjustments::NONE);
    let curve = flat_yts(0.03);
    let t2 = curve.time_from_reference(reference().plus_years(2).unwrap());
    let t6 = curve.time_from_reference(reference().plus_years(6).unwrap());

    // zerobond off the calibrated surface discounts below one and moves
    // inversely with the state.
    let low = model.zerobond(t2, t6, -model.state_stddev(t2)).unwrap();
    let mid = model.zerobond(t2, t6, 0.0).unwrap();
    let high = model.zerobond(t2, t6, model.state_stddev(t2)).unwrap();
    assert!(low > mid && mid > high, "{low} / {mid} / {high}");
    assert!(mid > 0.0 && mid < 1.0);

    // Forward rates follow.
    let f = model.forward_rate(t2, t6, t6 - t2, 0.0).unwrap();
    assert!(f > 0.0 && f < 0.1, "forward {f}");
}

#[test]
fn volatility_calibration_to_helpers_converges() {
    let model = flat_swaption_model(Adjustments::NONE);
    let curve = flat_yts(0.03);

    let mut helpers: Vec<SwaptionHelper> = Vec::new();
    for expiry_years in [1, 3] {
        let expiry = reference().plus_years(expiry_years).unwrap();
        let payments: Vec<Date> = ((expiry_years + 1)..=6)
            .map(|y| reference().plus_years(y).unwrap())
            .collect();
        let accruals = vec![1.0; payments.len()];
        helpers.push(
            SwaptionHelper::new(curve.clone(), expiry, payments, accruals, None, 0.20, 1.0)
                .unwrap(),
        );
    }
    let dyn_helpers: Vec<&dyn CalibrationHelper> =
        helpers.iter().map(|h| h as &dyn CalibrationHelper).collect();

    model
        .calibrate(
            &dyn_helpers,
            &LevenbergMarquardt::default(),
            &EndCriteria {
                max_iterations: 20,
                ..EndCriteria::default()
            },
        )
        .unwrap();

    for (i, helper) in helpers.iter().enumerate() {
        let error = helper.calibration_error(&model).unwrap().abs();
        assert!(error < 5e-2, "helper {i} calibration error {error}");
    }
}
