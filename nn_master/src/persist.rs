use std::{
    fmt::{Display, Write as _},
    fs::{self, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
    process::Command,
};

use chrono::Local;
use log::{debug, info, warn};
use neural_net::Network;

use crate::{Master, MasterErr, NeuralNetMaster, Result};

/// The file every run's hyperparameters are recorded to.
pub const HYPERPARAMETER_FILE: &str = "hyperparameter.txt";

const RUN_SEPARATOR: &str = "======Another Run======";

pub(crate) fn save<M>(model: &mut M, name: Option<&str>, model_plot: bool) -> Result<PathBuf>
where
    M: NeuralNetMaster + ?Sized,
{
    let master = model.master_mut();
    if let Some(name) = name {
        master.folder_name = Some(name.to_string());
    }

    let folder_name = match &master.folder_name {
        Some(folder_name) => folder_name.clone(),
        None => {
            let folder_name = folder_runnum(&master.current_dir);
            master.folder_name = Some(folder_name.clone());
            folder_name
        }
    };

    let folder = master.current_dir.join(&folder_name);
    fs::create_dir_all(&folder)?;
    master.full_file_path = Some(folder.clone());

    write_hyperparameters(master, &folder)?;

    if model_plot {
        model.plot_model()?;
    }

    model.post_training_checklist_child()?;
    model.master().history.save_file(&folder)?;

    info!("saved run to {}", folder.display());
    Ok(folder)
}

/// Generates a run folder name, `nn_master_{MMDD}_run{NNN}`, with the smallest run number that
/// isn't taken yet under `base`.
pub fn folder_runnum(base: &Path) -> String {
    let date = Local::now().format("%m%d");

    let mut runnum = 1;
    loop {
        let folder_name = format!("nn_master_{date}_run{runnum:03}");
        if !base.join(&folder_name).exists() {
            return folder_name;
        }

        runnum += 1;
    }
}

/// The `Key: value` lines recorded for a run, in order.
pub fn hyperparameter_record(master: &Master) -> String {
    let entries: [(&str, String); 16] = [
        ("Model", or_none(master.name.as_ref())),
        ("Model Type", or_none(master.model_type.as_ref())),
        ("Identifier", master.identifier().to_string()),
        ("Platform", master.platform().to_string()),
        ("Crate Version", master.crate_version().to_string()),
        ("Engine Version", master.engine_version().to_string()),
        ("Folder Name", or_none(master.folder_name.as_ref())),
        ("Batch size", master.batch_size.to_string()),
        ("Optimizer", or_none(master.optimizer.as_ref())),
        ("Maximum Epochs", or_none(master.max_epochs)),
        ("Learning Rate", or_none(master.lr)),
        ("Validation Size", or_none(master.val_size)),
        ("Input Shape", or_none(master.input_shape())),
        ("Label Shape", or_none(master.labels_shape())),
        ("Number of Training Data", or_none(master.num_train())),
        ("Number of Validation Data", or_none(master.val_num())),
    ];

    entries.iter().fold(String::new(), |mut record, (key, value)| {
        let _ = writeln!(record, "{key}: {value}");
        record
    })
}

fn or_none<T: Display>(value: Option<T>) -> String {
    value.map_or_else(|| "None".to_string(), |v| v.to_string())
}

fn write_hyperparameters(master: &Master, folder: &Path) -> Result<()> {
    let path = folder.join(HYPERPARAMETER_FILE);
    let rerun = path.is_file();

    let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
    if rerun {
        writeln!(file)?;
        writeln!(file, "{RUN_SEPARATOR}")?;
    }

    file.write_all(hyperparameter_record(master).as_bytes())?;
    debug!(path:? = path, rerun = rerun; "recorded hyperparameters");
    Ok(())
}

/// Describes the network's layers and their shapes in the Graphviz language.
pub fn model_dot(network: &Network) -> String {
    let mut dot = String::from("digraph model {\n    node [shape=record];\n");

    let layers = network.arch().layers();
    for layer in layers {
        let _ = writeln!(
            dot,
            "    \"{0}\" [label=\"{0}|{{input: {1:?}|output: {2:?}}}\"];",
            layer.name(),
            layer.input_shape(),
            layer.output_shape()
        );
    }

    for pair in layers.windows(2) {
        let _ = writeln!(dot, "    \"{}\" -> \"{}\";", pair[0].name(), pair[1].name());
    }

    dot.push_str("}\n");
    dot
}

pub(crate) fn plot_model(master: &Master, network: Option<&Network>) -> Result<()> {
    let network = network.ok_or(MasterErr::NotTrained("network"))?;

    let folder = master
        .full_file_path()
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    let dot_path = folder.join("model.dot");
    let png_path = folder.join("model.png");

    fs::write(&dot_path, model_dot(network))?;

    let status = Command::new("dot")
        .arg("-Tpng")
        .arg(&dot_path)
        .arg("-o")
        .arg(&png_path)
        .status();

    match status {
        Ok(status) if status.success() => {
            debug!(path:? = png_path; "plotted model");
        }
        Ok(status) => warn!("plot_model failed, dot exited with {status}"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!("Skipped plot_model! graphviz is required to plot the model architecture")
        }
        Err(e) => warn!("plot_model failed: {e}"),
    }

    Ok(())
}
