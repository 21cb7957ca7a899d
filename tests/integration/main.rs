mod pipeline_test;
mod thresholds_test;
