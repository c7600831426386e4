use numerair::random::{
    LecuyerUniformRng, MersenneTwisterDynamicRng, MtParameterSearch, UniformRng,
    Xoshiro256StarStar,
};

// State words for cross-checking against the published xoshiro256**
// reference implementation.
const S0: u64 = 10108360646465513120;
const S1: u64 = 4416403493985791904;
const S2: u64 = 7597776674045431742;
const S3: u64 = 6431387443075032236;

fn raw_step(s: &mut [u64; 4]) -> u64 {
    let result = s[1].wrapping_mul(5).rotate_left(7).wrapping_mul(9);
    let t = s[1] << 17;
    s[2] ^= s[0];
    s[3] ^= s[1];
    s[1] ^= s[2];
    s[0] ^= s[3];
    s[2] ^= t;
    s[3] = s[3].rotate_left(45);
    result
}

#[test]
fn xoshiro_state_seeding_reproduces_the_reference_sequence() {
    // Burn the warm-up on the raw reference state, then the streams must
    // agree draw for draw.
    let mut reference = [S0, S1, S2, S3];
    for _ in 0..1_000 {
        raw_step(&mut reference);
    }
    let mut rng = Xoshiro256StarStar::from_state(S0, S1, S2, S3).unwrap();
    for i in 0..1_001 {
        assert_eq!(
            raw_step(&mut reference),
            rng.next_u64(),
            "sequences diverged at draw {i}"
        );
    }
}

#[test]
fn xoshiro_same_seed_same_first_thousand() {
    let mut a = Xoshiro256StarStar::new(1);
    let mut b = Xoshiro256StarStar::new(1);
    for _ in 0..1_000 {
        assert_eq!(a.next_u64(), b.next_u64());
    }
    // The 1,001st draw still agrees.
    assert_eq!(a.next_u64(), b.next_u64());
}

#[test]
fn xoshiro_instances_do_not_interact() {
    let seed = 16880566536755896171;
    let mut reference = Xoshiro256StarStar::new(seed);
    let mut value = 0;
    for _ in 0..1_000 {
        value = reference.next_u64();
    }

    // Interleaved stepping of two fresh instances with the same seed
    // yields the same 1,000th value on each.
    let mut rng1 = Xoshiro256StarStar::new(seed);
    let mut rng2 = Xoshiro256StarStar::new(seed);
    let (mut v1, mut v2) = (0, 0);
    for _ in 0..1_000 {
        v1 = rng1.next_u64();
        v2 = rng2.next_u64();
    }
    assert_eq!(value, v1);
    assert_eq!(value, v2);
}

#[test]
fn xoshiro_mean_and_variance_of_next_real() {
    let mut rng = Xoshiro256StarStar::new(1);
    const N: usize = 10_000_000;
    let mut sum = 0.0;
    let mut sum2 = 0.0;
    for _ in 0..N {
        let u = rng.next_f64();
        assert!(u > 0.0 && u < 1.0, "draw {u} not in the open interval");
        sum += u;
        sum2 += u * u;
    }
    let mean = sum / N as f64;
    let variance = sum2 / N as f64 - mean * mean;
    assert!((mean - 0.5).abs() < 5e-3, "mean {mean}");
    assert!((variance - 1.0 / 12.0).abs() < 5e-5, "variance {variance}");
}

#[test]
fn lecuyer_reproducibility_and_range() {
    let mut a = LecuyerUniformRng::new(20_250_801);
    let mut b = LecuyerUniformRng::new(20_250_801);
    for _ in 0..1_000 {
        let u = a.next();
        assert!(u > 0.0 && u < 1.0);
        assert_eq!(u, b.next());
    }
    assert_eq!(a.weight(), 1.0);
}

#[test]
fn dynamic_creator_end_to_end() {
    // Search a parameter set, embed an id, and run the stream.
    let mut search = MtParameterSearch::new(4172);
    let description = search.find_with_id(32, 521, 0x2a).unwrap();
    assert_eq!(description.aaa & 0xffff, 0x2a);

    let mut rng = MersenneTwisterDynamicRng::from_description(description, 1234);
    let mut other = MersenneTwisterDynamicRng::from_description(description, 1234);
    for _ in 0..2_000 {
        let u = rng.next_f64();
        assert!(u > 0.0 && u < 1.0);
        other.next_f64();
    }
    // discard() keeps streams aligned.
    let mut ahead = MersenneTwisterDynamicRng::from_description(description, 1234);
    ahead.discard(2_000);
    assert_eq!(ahead.next_u32(), rng.next_u32());
}

#[test]
fn dynamic_creator_batch_produces_distinct_streams() {
    let mut search = MtParameterSearch::new(99);
    let descriptions = search.find_batch(32, 521, 0, 2).unwrap();
    assert_eq!(descriptions.len(), 2);
    assert_ne!(descriptions[0].aaa, descriptions[1].aaa);

    let mut a = MersenneTwisterDynamicRng::from_description(descriptions[0], 7);
    let mut b = MersenneTwisterDynamicRng::from_description(descriptions[1], 7);
    let collisions = (0..1_000).filter(|_| a.next_u32() == b.next_u32()).count();
    assert!(collisions < 5, "streams look identical: {collisions} collisions");
}
