use clap::{value_parser, Arg};
use log::info;
use ndarray::{Array, Array2, Axis};

use optim_config::{model::Linear, Subset};

const DEFAULT_EPOCHS: &str = "50";
const SAMPLES: usize = 32;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let options = optim_config::OptionsParser::new()
        .arg(
            Arg::new("epochs")
                .long("epochs")
                .help("Last epoch to train")
                .value_parser(value_parser!(usize))
                .default_value(DEFAULT_EPOCHS),
        )
        .try_parse_from(std::env::args_os())?;
    let epochs = options
        .matches()
        .get_one::<usize>("epochs")
        .copied()
        .unwrap_or_default();

    let subset = Subset::None;
    let mut model = Linear::new((1, 1), 0.);
    let mut optimizer = optim_config::optimizer(&options, &model, &subset)?;
    let mut lr_chkp = optim_config::lr_checkpointer(&options, optimizer.as_mut(), &subset)?;
    let mut scheduler = optim_config::scheduler(&options, &subset)?;
    let (mut epoch_chkp, current_epoch) = optim_config::epoch_checkpointer(&options, &subset)?;

    let (x, y) = dataset();
    info!("training {} from epoch {current_epoch} to {epochs}", optimizer.name());

    for epoch in current_epoch..=epochs {
        optimizer.zero_grad(&mut model);
        let loss = model.backward_mse(x.view(), y.view())?;
        optimizer.step(&mut model)?;
        let lr = scheduler.step(optimizer.as_mut(), loss);

        info!("epoch {epoch}: loss {loss:.4e}, lr {lr:.2e}");

        epoch_chkp.save(&(epoch + 1))?;
        lr_chkp.save(&lr)?;
    }

    info!(
        "fitted y = {:.3}x + {:.3}",
        model.weight.data[0], model.bias.data[0]
    );
    Ok(())
}

/// Samples of `y = 2x + 1` over `[-1, 1]`.
fn dataset() -> (Array2<f32>, Array2<f32>) {
    let x = Array::linspace(-1., 1., SAMPLES).insert_axis(Axis(1));
    let y = x.mapv(|v| 2. * v + 1.);
    (x, y)
}
