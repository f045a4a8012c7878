mod flow;
mod run;
mod run_node;
