use std::path::Path;

use optim_config::{
    epoch_checkpointer, lr_checkpointer, model::Linear, optimizer, Checkpointer, Options,
    OptionsParser, Subset,
};

fn parse(save_path: &Path, args: &[&str]) -> Options {
    let save_path = save_path.to_str().unwrap();
    let args = ["prog", "--save_path", save_path, "--experiment_name", "run"]
        .into_iter()
        .chain(args.iter().copied());
    OptionsParser::new().try_parse_from(args).unwrap()
}

#[test]
fn fresh_run_starts_at_epoch_one() {
    let dir = tempfile::tempdir().unwrap();
    let opts = parse(dir.path(), &[]);

    let (chkp, epoch) = epoch_checkpointer(&opts, &Subset::None).unwrap();
    assert_eq!(epoch, 1);
    assert_eq!(chkp.name(), "epoch_run");
    assert_eq!(chkp.directory(), dir.path());
}

#[test]
fn saved_epoch_is_restored() {
    let dir = tempfile::tempdir().unwrap();
    let opts = parse(dir.path(), &[]);

    let (mut chkp, _) = epoch_checkpointer(&opts, &Subset::None).unwrap();
    for epoch in 2..=5 {
        chkp.save(&epoch).unwrap();
    }

    let (_, epoch) = epoch_checkpointer(&opts, &Subset::None).unwrap();
    assert_eq!(epoch, 5);
    assert!(dir.path().join("epoch_run.json").is_file());
}

#[test]
fn saved_epoch_zero_falls_back_to_one() {
    let dir = tempfile::tempdir().unwrap();
    Checkpointer::<usize>::new("epoch_run", dir.path())
        .save(&0)
        .unwrap();

    let (_, epoch) = epoch_checkpointer(&parse(dir.path(), &[]), &Subset::None).unwrap();
    assert_eq!(epoch, 1);
}

#[test]
fn learning_rate_defaults_to_the_option() {
    let dir = tempfile::tempdir().unwrap();
    let opts = parse(dir.path(), &["--optimizer", "sgd", "--lr", "0.05"]);
    let model = Linear::new((1, 1), 0.);

    let mut optim = optimizer(&opts, &model, &Subset::None).unwrap();
    optim.set_lr(1.);
    let chkp = lr_checkpointer(&opts, optim.as_mut(), &Subset::None).unwrap();

    assert_eq!(optim.lr(), 0.05);
    assert_eq!(chkp.name(), "lr_run");
}

#[test]
fn saved_learning_rate_overrides_the_option() {
    let dir = tempfile::tempdir().unwrap();
    let opts = parse(dir.path(), &["--lr", "0.05"]);
    let model = Linear::new((1, 1), 0.);

    let mut optim = optimizer(&opts, &model, &Subset::None).unwrap();
    let mut chkp = lr_checkpointer(&opts, optim.as_mut(), &Subset::None).unwrap();
    chkp.save(&0.0125).unwrap();

    let mut resumed = optimizer(&opts, &model, &Subset::None).unwrap();
    lr_checkpointer(&opts, resumed.as_mut(), &Subset::None).unwrap();
    assert_eq!(resumed.lr(), 0.0125);
}

#[test]
fn saved_learning_rate_zero_falls_back_to_the_option() {
    let dir = tempfile::tempdir().unwrap();
    Checkpointer::<f32>::new("lr_run", dir.path())
        .save(&0.)
        .unwrap();

    let opts = parse(dir.path(), &["--lr", "0.05"]);
    let model = Linear::new((1, 1), 0.);
    let mut optim = optimizer(&opts, &model, &Subset::None).unwrap();
    lr_checkpointer(&opts, optim.as_mut(), &Subset::None).unwrap();
    assert_eq!(optim.lr(), 0.05);
}

#[test]
fn experiments_do_not_share_checkpoints() {
    let dir = tempfile::tempdir().unwrap();
    let (mut chkp, _) = epoch_checkpointer(&parse(dir.path(), &[]), &Subset::None).unwrap();
    chkp.save(&7).unwrap();

    let other = parse(dir.path(), &["--experiment_name", "other"]);
    let (_, epoch) = epoch_checkpointer(&other, &Subset::None).unwrap();
    assert_eq!(epoch, 1);
}
