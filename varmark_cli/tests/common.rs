use assert_cmd::Command;

pub fn varmark_cmd() -> Command {
	let mut cmd = Command::cargo_bin("varmark").expect("varmark binary should build");
	cmd.env("NO_COLOR", "1");
	cmd
}
