mod files;
mod helpers;
mod observation_source;
mod weather;
