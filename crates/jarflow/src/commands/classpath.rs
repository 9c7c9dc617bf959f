use jarflow_core::LoadedProject;

/// 解決済みの座標を 1 行ずつ出力（スクリプトから扱えるよう装飾なし）
pub fn handle(loaded: &LoadedProject, compile: bool) -> anyhow::Result<()> {
    let classpath = loaded.classpath()?;
    let entries = if compile {
        classpath.compile()
    } else {
        classpath.runtime()
    };

    for dependency in entries {
        println!("{}", dependency.coordinate);
    }
    Ok(())
}
