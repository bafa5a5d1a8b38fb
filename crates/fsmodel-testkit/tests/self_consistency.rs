//! Integration test: the generator, checker and `ModelSut` run together
//! for a few hundred trials and must never report a divergence, since
//! both sides of the comparison are the same reference model
//! (`SPEC_FULL.md` §8, testable property #8's sibling check — "the model
//! never diverges from itself").

use fsmodel_core::FsState;
use fsmodel_testkit::sut::{drive, ModelSut, Sut};
use fsmodel_testkit::{check, generate, CheckOutcome, GeneratorConfig};

const TRIALS: u64 = 300;
const HISTORY_LENGTH: usize = 150;

#[test]
fn model_never_diverges_from_itself_across_many_seeds() {
    for seed in 0..TRIALS {
        let config = GeneratorConfig { length: HISTORY_LENGTH, lose_unfsynced_writes_enabled: true, ..GeneratorConfig::new(seed) };
        let history = generate(&config);

        let initial = FsState::new();
        let mut sut = ModelSut::new();
        sut.setup().expect("ModelSut::setup never fails");
        let actual = drive(&mut sut, &history, 0);
        sut.teardown().expect("ModelSut::teardown never fails");

        match check(&initial, &actual) {
            CheckOutcome::Valid => {}
            CheckOutcome::Invalid(d) => panic!("seed {seed} diverged at index {}: expected {:?}, actual {:?}", d.index, d.expected, d.actual),
        }
    }
}
