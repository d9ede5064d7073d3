/*!
# I/O Utilities for Saving Topic Models to CSV

This module saves dense posterior matrices and per-token assignments as CSV files.
Enable via the `csv` feature.
*/

use std::error::Error;
use std::fs::File;

use csv::Writer;
use ndarray::Array2;

use crate::report::TopicAssignments;

/**
Saves a dense matrix as a CSV file.

The resulting CSV file will have:
- A header row containing `"row"` and one column per matrix column, named
  `"{prefix}_0"`, `"{prefix}_1"`, etc.
- One subsequent row per matrix row, starting with its index.

# Examples

```rust
use topic_mcmc::io::csv::save_matrix_csv;
use ndarray::arr2;

// Two entities over three topics.
let vartheta = arr2(&[[0.2, 0.3, 0.5], [0.6, 0.2, 0.2]]);

save_matrix_csv(&vartheta, "topic", "/tmp/vartheta.csv").expect("Expecting saving data to succeed");
# Ok::<(), Box<dyn std::error::Error>>(())
```
*/
pub fn save_matrix_csv<T: std::fmt::Display>(
    matrix: &Array2<T>,
    prefix: &str,
    filename: &str,
) -> Result<(), Box<dyn Error>> {
    let mut wtr = Writer::from_writer(File::create(filename)?);

    let mut header: Vec<String> = vec!["row".to_string()];
    header.extend((0..matrix.ncols()).map(|i| format!("{prefix}_{i}")));
    wtr.write_record(&header)?;

    for (i, row) in matrix.rows().into_iter().enumerate() {
        let mut record = vec![i.to_string()];
        record.extend(row.iter().map(|v| v.to_string()));
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}

/**
Saves every sampled token as one CSV row `doc,position,term,topic,entity`.

Documents that were skipped by the sampler contribute no rows.
*/
pub fn save_assignments_csv<M: TopicAssignments + ?Sized>(
    model: &M,
    filename: &str,
) -> Result<(), Box<dyn Error>> {
    let mut wtr = Writer::from_writer(File::create(filename)?);
    wtr.write_record(["doc", "position", "term", "topic", "entity"])?;

    let corpus = model.sampled_corpus();
    for (m, doc) in model.token_assignments().iter().enumerate() {
        for (n, a) in doc.iter().enumerate() {
            wtr.write_record(&[
                m.to_string(),
                n.to_string(),
                corpus.doc(m).word(n).to_string(),
                a.topic.to_string(),
                a.entity.to_string(),
            ])?;
        }
    }

    wtr.flush()?;
    Ok(())
}
