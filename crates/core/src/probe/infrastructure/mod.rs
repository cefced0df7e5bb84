pub mod ffprobe_prober;
